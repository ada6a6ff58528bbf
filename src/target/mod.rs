// src/target/mod.rs
// =============================================================================
// Crawl targets: what the crawler is going to fetch, and where from.
//
// A DomainTarget is a URL plus an optional IP to dial instead of resolving the
// URL's host. Targets come from two places:
// - discovered vhosts (discovery::VhostEntry)
// - a manual list typed by the operator (manual.rs)
// Both go through DomainTarget::new, so both get the same validation.
//
// filter.rs then narrows the list down with scheme flags and globs.
// =============================================================================

mod filter;
mod manual;

pub use filter::DomainFilter;
pub use manual::parse_manual_list;

use crate::discovery::VhostEntry;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid domain/url/ip/port provided: {token:?}")]
    MalformedManualTarget { token: String },

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme {scheme:?} in {url:?} (only http and https)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("invalid ip address {0:?}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainTarget {
    url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_ip: Option<IpAddr>,
}

impl DomainTarget {
    pub fn new(url: &str, override_ip: Option<&str>) -> Result<Self, TargetError> {
        let parsed = Url::parse(url).map_err(|e| TargetError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(TargetError::UnsupportedScheme {
                url: url.to_string(),
                scheme: parsed.scheme().to_string(),
            });
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(TargetError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let override_ip = override_ip
            .map(|ip| ip.parse::<IpAddr>().map_err(|_| TargetError::InvalidAddress(ip.to_string())))
            .transpose()?;

        Ok(DomainTarget { url: parsed, override_ip })
    }

    pub fn from_vhost(entry: &VhostEntry) -> Result<Self, TargetError> {
        let ip = entry.ip.map(|ip| ip.to_string());
        DomainTarget::new(entry.url.as_str(), ip.as_deref())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn override_ip(&self) -> Option<IpAddr> {
        self.override_ip
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

impl fmt::Display for DomainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.override_ip {
            Some(ip) => write!(f, "{} ({})", self.url, ip),
            None => write!(f, "{}", self.url),
        }
    }
}

/// A host name with at least two labels, e.g. "example.com".
///
/// Labels are 1-63 characters of letters, digits, '-' and '_', and can't
/// start or end with '-'. The whole name is at most 350 characters and the
/// last label is 2-63 letters/digits.
pub fn is_valid_hostname(host: &str) -> bool {
    if host.len() < 4 || host.len() > 350 {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });

    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphanumeric())
}
