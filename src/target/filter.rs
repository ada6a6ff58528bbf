// src/target/filter.rs
// =============================================================================
// Narrows the target list down before crawling.
//
// Rules, applied in this order to each target:
// 1. drop http:// targets if ignore_http, https:// targets if ignore_https
// 2. drop targets matching any blacklist glob
// 3. if there is a whitelist, drop targets matching none of its globs
//
// Globs are pipe separated ("*.example.com|*.example.org") and are matched
// against the host. A glob with a scheme ("https://*") is matched against
// the full URL instead.
// =============================================================================

use super::DomainTarget;
use glob::{Pattern, PatternError};

#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    pub ignore_http: bool,
    pub ignore_https: bool,
    ignore_match: Vec<Pattern>,
    match_only: Vec<Pattern>,
}

impl DomainFilter {
    pub fn new(ignore_http: bool, ignore_https: bool, ignore_match: &str, match_only: &str) -> Result<Self, PatternError> {
        Ok(DomainFilter {
            ignore_http,
            ignore_https,
            ignore_match: parse_globs(ignore_match)?,
            match_only: parse_globs(match_only)?,
        })
    }

    pub fn allows(&self, target: &DomainTarget) -> bool {
        match target.url().scheme() {
            "http" if self.ignore_http => return false,
            "https" if self.ignore_https => return false,
            _ => {}
        }

        if self.ignore_match.iter().any(|glob| matches(glob, target)) {
            return false;
        }

        self.match_only.is_empty() || self.match_only.iter().any(|glob| matches(glob, target))
    }

    /// Keeps the allowed targets, in their original order
    pub fn apply(&self, targets: Vec<DomainTarget>) -> Vec<DomainTarget> {
        targets.into_iter().filter(|target| self.allows(target)).collect()
    }
}

fn parse_globs(list: &str) -> Result<Vec<Pattern>, PatternError> {
    list.split('|')
        .map(str::trim)
        .filter(|glob| !glob.is_empty())
        .map(Pattern::new)
        .collect()
}

fn matches(glob: &Pattern, target: &DomainTarget) -> bool {
    if glob.as_str().contains("://") {
        glob.matches(target.url().as_str())
    } else {
        glob.matches(target.host())
    }
}
