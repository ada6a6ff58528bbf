// src/discovery/error.rs
// =============================================================================
// Errors raised while discovering webservers and their vhosts.
//
// Some of these stop discovery entirely (no socket data, no webservers), some
// only stop one webserver (no entries, unimplemented kind), and VhostParse is
// only ever a warning attached to an otherwise successful extraction.
// =============================================================================

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Neither /proc/net/tcp nor /proc/net/tcp6 could be read
    #[error("unable to read socket table {path}: {source}")]
    NoSocketData {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("did not find any webservers running")]
    NoWebservers,

    /// The webserver's config-dump command could not be started
    #[error("unable to obtain vhost data from `{command}`: {source}")]
    VhostFetch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` didn't return valid vhost entries")]
    VhostInvalid { command: String },

    #[error("unable to parse vhost line {line_no}: {line:?}")]
    VhostParse { line_no: usize, line: String },

    #[error("no {kind} vhost entries found")]
    VhostNoEntries { kind: String },

    #[error("the webserver {0} is not implemented at this time")]
    UnimplementedWebserver(String),
}

impl DiscoveryError {
    /// Whether this error ends the whole discovery run rather than one
    /// webserver (or one line) of it
    pub fn is_fatal(&self) -> bool {
        matches!(self, DiscoveryError::NoSocketData { .. } | DiscoveryError::NoWebservers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(DiscoveryError::NoWebservers.is_fatal());
        assert!(!DiscoveryError::UnimplementedWebserver("nginx".into()).is_fatal());
        assert!(!DiscoveryError::VhostNoEntries { kind: "apache".into() }.is_fatal());
    }

    #[test]
    fn test_unimplemented_names_the_kind() {
        let err = DiscoveryError::UnimplementedWebserver("lighttpd".into());
        assert_eq!(err.to_string(), "the webserver lighttpd is not implemented at this time");
    }
}
