// src/discovery/webserver.rs
// =============================================================================
// Picks the webservers out of the processes that own listening sockets.
//
// The set of webservers we know about is closed: each kind lists the binary
// names it runs as. Order in the registry is also priority order, which is
// how the "main" webserver is chosen when several are running:
//   1. kind priority (Apache, then Nginx, Lighttpd, Caddy)
//   2. lowest pid
// =============================================================================

use super::error::DiscoveryError;
use super::process::Process;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebserverKind {
    Apache,
    Nginx,
    Lighttpd,
    Caddy,
}

impl WebserverKind {
    /// Every known kind, in priority order
    pub const ALL: [WebserverKind; 4] = [
        WebserverKind::Apache,
        WebserverKind::Nginx,
        WebserverKind::Lighttpd,
        WebserverKind::Caddy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WebserverKind::Apache => "apache",
            WebserverKind::Nginx => "nginx",
            WebserverKind::Lighttpd => "lighttpd",
            WebserverKind::Caddy => "caddy",
        }
    }

    /// Binary names this kind runs as
    pub fn binaries(self) -> &'static [&'static str] {
        match self {
            WebserverKind::Apache => &["httpd", "apache2", "apache"],
            WebserverKind::Nginx => &["nginx"],
            WebserverKind::Lighttpd => &["lighttpd"],
            WebserverKind::Caddy => &["caddy"],
        }
    }

    pub fn from_binary(binary: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.binaries().contains(&binary))
    }

    /// Classifies a process by its command name, falling back to the file
    /// name of its executable
    pub fn of_process(process: &Process) -> Option<Self> {
        Self::from_binary(&process.name).or_else(|| process.exe_name().and_then(Self::from_binary))
    }
}

impl fmt::Display for WebserverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct WebserverInfo {
    pub process: Process,
    pub kind: WebserverKind,
    pub is_main: bool,
}

// Filters to webservers and flags exactly one of them as main.
// The result is sorted so that the main process always comes first.
pub fn classify(processes: Vec<Process>) -> Result<Vec<WebserverInfo>, DiscoveryError> {
    let mut webservers: Vec<WebserverInfo> = processes
        .into_iter()
        .filter_map(|process| {
            let kind = WebserverKind::of_process(&process)?;
            Some(WebserverInfo { process, kind, is_main: false })
        })
        .collect();

    if webservers.is_empty() {
        return Err(DiscoveryError::NoWebservers);
    }

    webservers.sort_by_key(|ws| (ws.kind, ws.process.pid, ws.process.local_port));
    webservers[0].is_main = true;

    Ok(webservers)
}

/// One process per kind (the first of each in sorted order), main first
pub fn representatives(webservers: &[WebserverInfo]) -> Vec<&WebserverInfo> {
    let mut seen = Vec::new();
    webservers
        .iter()
        .filter(|ws| {
            if seen.contains(&ws.kind) {
                false
            } else {
                seen.push(ws.kind);
                true
            }
        })
        .collect()
}
