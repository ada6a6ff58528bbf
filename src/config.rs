// src/config.rs
// =============================================================================
// Run configuration for the crawler.
//
// Built once from the command line and shared read-only with every worker
// (behind an Arc). Nothing in the crawler reads global state.
// =============================================================================

use log::warn;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Number of targets fetched at the same time
    pub threads: usize,
    /// Per-request timeout, connect through last body byte
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Fetch the assets referenced by each page
    pub recursive: bool,
    /// Fetch assets on other hosts too (only with `recursive`)
    pub follow_remote: bool,
    /// Remote hosts whose assets are fetched even when `follow_remote` is off
    pub allowed_remote_hosts: Vec<String>,
    /// Sleep before each target's first request
    pub delay: Duration,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            threads: resolve_threads(0, num_cpus::get()),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            recursive: false,
            follow_remote: true,
            allowed_remote_hosts: Vec::new(),
            delay: Duration::ZERO,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CrawlConfig {
    pub fn allows_remote_host(&self, host: &str) -> bool {
        self.allowed_remote_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}

// 0 means "pick for me": half the cores, at least one.
// More threads than cores is capped to the core count.
pub fn resolve_threads(requested: usize, cores: usize) -> usize {
    let cores = cores.max(1);

    if requested == 0 {
        return (cores / 2).max(1);
    }

    if requested > cores {
        warn!(
            "{} threads specified, which is more than the amount of cores ({}), limiting to {}",
            requested, cores, cores
        );
        return cores;
    }

    requested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_threads() {
        assert_eq!(resolve_threads(0, 8), 4);
        assert_eq!(resolve_threads(0, 1), 1);
        assert_eq!(resolve_threads(0, 0), 1);
        assert_eq!(resolve_threads(3, 8), 3);
        assert_eq!(resolve_threads(64, 8), 8);
    }

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 10);
        assert!(config.threads >= 1);
    }

    #[test]
    fn test_allowed_remote_hosts() {
        let config = CrawlConfig {
            allowed_remote_hosts: vec!["cdn.example.net".to_string()],
            ..CrawlConfig::default()
        };
        assert!(config.allows_remote_host("CDN.example.net"));
        assert!(!config.allows_remote_host("evil.example.net"));
    }
}
