// src/crawl/fetch.rs
// =============================================================================
// HTTP fetching for one crawl target.
//
// Key functionality:
// - Builds a dedicated client per target. When the target has an override IP
//   the client's resolver maps the target host to that IP, so we dial the IP
//   while the Host header and TLS SNI still carry the real host name. The
//   override lives and dies with that one client.
// - Enforces the per-request timeout and the redirect cap.
// - Sorts reqwest failures into FetchError variants.
// =============================================================================

use super::result::{FetchError, PageResponse, ResourceResult};
use crate::config::CrawlConfig;
use crate::target::DomainTarget;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use std::collections::BTreeMap;
use std::error::Error as _;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;
use url::Url;

pub fn build_client(target: &DomainTarget, config: &CrawlConfig) -> Result<Client, FetchError> {
    client_builder(target, config)?
        .build()
        .map_err(|e| FetchError::Request(e.to_string()))
}

// Everything but the final build, so extra trust roots can be added on top
fn client_builder(target: &DomainTarget, config: &CrawlConfig) -> Result<ClientBuilder, FetchError> {
    // No proxies: the request has to reach the address we picked
    let mut builder = Client::builder()
        .no_proxy()
        .timeout(config.timeout)
        .redirect(Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str());

    if let Some(ip) = target.override_ip() {
        let ip = dialable(ip)?;
        // reqwest only takes the address from this, the port still comes
        // from the URL
        let port = target.url().port_or_known_default().unwrap_or(80);
        builder = builder.resolve(target.host(), SocketAddr::new(ip, port));
    }

    Ok(builder)
}

// Addresses that parse fine but can never be a webserver to connect to
fn dialable(ip: IpAddr) -> Result<IpAddr, FetchError> {
    let broadcast = matches!(ip, IpAddr::V4(v4) if v4.is_broadcast());
    if ip.is_unspecified() || ip.is_multicast() || broadcast {
        return Err(FetchError::InvalidOverrideAddress(ip.to_string()));
    }
    Ok(ip)
}

/// Fetches a target's page, keeping the body for asset extraction
pub async fn fetch_page(client: &Client, url: &Url) -> Result<PageResponse, FetchError> {
    let response = client.get(url.clone()).send().await.map_err(classify_error)?;

    let status = response.status().as_u16();
    let final_url = response.url().clone();

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in response.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let body = response.text().await.map_err(classify_error)?;

    Ok(PageResponse {
        status,
        final_url,
        headers,
        body,
    })
}

/// Fetches one asset. Failures are recorded on the result, they never fail
/// the page that referenced the asset.
pub async fn fetch_resource(client: &Client, url: Url) -> ResourceResult {
    let started = Instant::now();

    let result = async {
        let response = client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, body.len()))
    }
    .await;

    match result {
        Ok((status, content_length)) => ResourceResult {
            url,
            status: Some(status),
            content_length,
            elapsed: started.elapsed(),
            error: None,
        },
        Err(err) => ResourceResult {
            url,
            status: None,
            content_length: 0,
            elapsed: started.elapsed(),
            error: Some(classify_error(err)),
        },
    }
}

// Works out why a request failed.
//
// reqwest flags timeouts, redirect-limit breaches and connect failures
// directly. TLS problems surface as connect errors, so the causes are
// checked for them first.
pub fn classify_error(error: reqwest::Error) -> FetchError {
    let causes = error_causes(&error);
    let detail = if causes.is_empty() {
        error.to_string()
    } else {
        format!("{}: {}", error, causes.join(": "))
    };

    let tls = causes.iter().any(|cause| {
        let cause = cause.to_ascii_lowercase();
        cause.contains("certificate") || cause.contains("tls") || cause.contains("ssl")
    });

    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if tls {
        FetchError::Tls(detail)
    } else if error.is_connect() {
        FetchError::ConnectFailed(detail)
    } else {
        FetchError::Request(detail)
    }
}

// Messages of the errors underneath reqwest's own, outermost first.
// The top-level message carries the URL, which must not be mistaken for
// a TLS cause ("https://ssl.example.com").
fn error_causes(error: &reqwest::Error) -> Vec<String> {
    let mut causes: Vec<String> = Vec::new();
    let mut source = error.source();
    while let Some(err) = source {
        let text = err.to_string();
        if !causes.contains(&text) {
            causes.push(text);
        }
        source = err.source();
    }
    causes
}
