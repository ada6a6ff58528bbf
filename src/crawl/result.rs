// src/crawl/result.rs
// =============================================================================
// What a crawl produces.
//
// - FetchError:     why a page or asset couldn't be fetched
// - PageResponse:   the response for a target's own URL
// - ResourceResult: one fetched asset
// - FetchOutcome:   everything about one target, immutable once built
// - ResultSet:      all outcomes of a run, handed to whoever scores them
//
// Outcomes are built only through FetchOutcome::success / ::failure, which
// guarantees that exactly one of response/error is set.
// =============================================================================

use crate::target::DomainTarget;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    #[error("invalid override address {0}")]
    InvalidOverrideAddress(String),
    #[error("tls error: {0}")]
    Tls(String),
    #[error("request failed: {0}")]
    Request(String),
    /// The worker fetching this target died (panicked or was cancelled)
    #[error("worker fault: {0}")]
    WorkerFault(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub status: u16,
    pub final_url: Url,
    pub headers: BTreeMap<String, String>,
    #[serde(skip)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceResult {
    pub url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub content_length: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    target: DomainTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<PageResponse>,
    resources: Vec<ResourceResult>,
    skipped: Vec<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<FetchError>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    elapsed: Duration,
}

impl FetchOutcome {
    pub fn success(
        target: DomainTarget,
        response: PageResponse,
        resources: Vec<ResourceResult>,
        skipped: Vec<Url>,
        elapsed: Duration,
    ) -> Self {
        FetchOutcome {
            target,
            response: Some(response),
            resources,
            skipped,
            error: None,
            elapsed,
        }
    }

    pub fn failure(target: DomainTarget, error: FetchError, elapsed: Duration) -> Self {
        FetchOutcome {
            target,
            response: None,
            resources: Vec::new(),
            skipped: Vec::new(),
            error: Some(error),
            elapsed,
        }
    }

    pub fn target(&self) -> &DomainTarget {
        &self.target
    }

    pub fn response(&self) -> Option<&PageResponse> {
        self.response.as_ref()
    }

    pub fn resources(&self) -> &[ResourceResult] {
        &self.resources
    }

    /// Assets found on the page but not fetched because they were remote
    pub fn skipped(&self) -> &[Url] {
        &self.skipped
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// All outcomes of one crawl. Order is completion order, not input order;
/// use `find` to look an outcome up by its target.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    outcomes: Vec<FetchOutcome>,
}

impl ResultSet {
    pub fn new() -> Self {
        ResultSet::default()
    }

    pub fn push(&mut self, outcome: FetchOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FetchOutcome> {
        self.outcomes.iter()
    }

    pub fn find(&self, url: &str, override_ip: Option<IpAddr>) -> Option<&FetchOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.target.url().as_str() == url && o.target.override_ip() == override_ip)
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a FetchOutcome;
    type IntoIter = std::slice::Iter<'a, FetchOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}
