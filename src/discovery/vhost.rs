// src/discovery/vhost.rs
// =============================================================================
// Vhost extraction, one strategy per webserver kind.
//
// Each kind gets exactly one extraction function, picked by a match on the
// kind. Supporting a new webserver means adding a variant to WebserverKind
// and an arm here.
// =============================================================================

use super::apache;
use super::error::DiscoveryError;
use super::webserver::{WebserverInfo, WebserverKind};
use crate::target::is_valid_hostname;
use std::net::IpAddr;
use url::Url;

/// A domain a webserver answers for, and the address it answers on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhostEntry {
    pub url: Url,
    pub ip: Option<IpAddr>,
}

impl VhostEntry {
    /// Builds the crawlable URL for a vhost host name on a port.
    /// 443 and 8443 are https, everything else http.
    pub fn new(host: &str, port: u16, ip: Option<IpAddr>) -> Option<Self> {
        if !is_valid_hostname(host) {
            return None;
        }

        let scheme = if port == 443 || port == 8443 { "https" } else { "http" };
        let mut url = Url::parse(&format!("{}://{}/", scheme, host)).ok()?;
        // Url drops the port by itself when it's the scheme default
        url.set_port(Some(port)).ok()?;

        Some(VhostEntry { url, ip })
    }
}

/// Everything one webserver's extraction produced
#[derive(Debug, Default)]
pub struct Extraction {
    pub entries: Vec<VhostEntry>,
    /// Recoverable problems (unparseable lines) hit along the way
    pub warnings: Vec<DiscoveryError>,
}

impl WebserverKind {
    pub fn extract_vhosts(self, webserver: &WebserverInfo) -> Result<Extraction, DiscoveryError> {
        match self {
            WebserverKind::Apache => apache::extract(webserver),
            WebserverKind::Nginx | WebserverKind::Lighttpd | WebserverKind::Caddy => {
                Err(DiscoveryError::UnimplementedWebserver(self.name().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::process::Process;
    use std::net::Ipv4Addr;
    use std::path::PathBuf;

    #[test]
    fn test_entry_scheme_and_port() {
        let entry = VhostEntry::new("example.com", 80, None).unwrap();
        assert_eq!(entry.url.as_str(), "http://example.com/");

        let entry = VhostEntry::new("example.com", 443, None).unwrap();
        assert_eq!(entry.url.as_str(), "https://example.com/");

        let entry = VhostEntry::new("example.com", 8080, None).unwrap();
        assert_eq!(entry.url.as_str(), "http://example.com:8080/");

        let entry = VhostEntry::new("example.com", 8443, None).unwrap();
        assert_eq!(entry.url.as_str(), "https://example.com:8443/");
    }

    #[test]
    fn test_entry_rejects_bad_hosts() {
        assert!(VhostEntry::new("bad..domain", 80, None).is_none());
        assert!(VhostEntry::new("*.example.com", 80, None).is_none());
        assert!(VhostEntry::new("localhost", 80, None).is_none());
    }

    #[test]
    fn test_unimplemented_kind() {
        let info = WebserverInfo {
            process: Process {
                pid: 1,
                exe: PathBuf::from("/usr/sbin/nginx"),
                name: "nginx".to_string(),
                user: String::new(),
                local_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                local_port: 80,
                peer_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                peer_port: 0,
            },
            kind: WebserverKind::Nginx,
            is_main: true,
        };

        match WebserverKind::Nginx.extract_vhosts(&info) {
            Err(DiscoveryError::UnimplementedWebserver(kind)) => assert_eq!(kind, "nginx"),
            other => panic!("expected UnimplementedWebserver, got {:?}", other),
        }
    }
}
