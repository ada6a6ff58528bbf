// src/discovery/mod.rs
// =============================================================================
// This module finds out what the host is serving.
//
// Pipeline (one synchronous pass, a snapshot of the moment it runs):
// 1. socket:    read the kernel TCP tables, keep listening sockets
// 2. process:   map each socket to the process that owns it
// 3. webserver: keep only known webserver processes, pick the main one
// 4. vhost:     ask each kind of webserver for its vhosts
//
// The result is a list of VhostEntry values that the target module turns
// into crawl targets.
// =============================================================================

mod apache;
mod error;
mod procfs;
mod process;
mod socket;
mod vhost;
mod webserver;

pub use error::DiscoveryError;
pub use procfs::ProcFs;
pub use vhost::VhostEntry;
pub use webserver::WebserverInfo;

use log::{debug, info, warn};
use process::ProcessCorrelator;

/// Steps 1 to 3: which webservers are listening right now
pub fn find_webservers(procfs: &ProcFs) -> Result<Vec<WebserverInfo>, DiscoveryError> {
    let listening: Vec<_> = socket::read_socket_table(procfs)?
        .into_iter()
        .filter(|socket| socket.is_listening())
        .collect();
    debug!("{} listening sockets", listening.len());

    let processes = ProcessCorrelator::new(procfs).correlate(&listening);
    let webservers = webserver::classify(processes)?;

    let summary: Vec<String> = webservers
        .iter()
        .map(|ws| format!("[{}:{}]", ws.process.name, ws.process.pid))
        .collect();
    debug!("found {} procs matching a webserver: {}", webservers.len(), summary.join(" "));

    Ok(webservers)
}

// Step 4. Webserver kinds are asked one at a time, main first. A kind that
// fails is skipped; the run only fails when no kind produced anything.
pub fn find_vhosts(webservers: &[WebserverInfo]) -> Result<Vec<VhostEntry>, DiscoveryError> {
    let mut entries: Vec<VhostEntry> = Vec::new();
    let mut first_error = None;

    for ws in webserver::representatives(webservers) {
        match ws.kind.extract_vhosts(ws) {
            Ok(extraction) => {
                info!(
                    "found {} vhosts on {} (exe: {}, pid: {})",
                    extraction.entries.len(),
                    ws.kind,
                    ws.process.exe.display(),
                    ws.process.pid
                );
                for entry in extraction.entries {
                    if !entries.contains(&entry) {
                        entries.push(entry);
                    }
                }
            }
            Err(err) => {
                warn!("skipping {} (pid {}): {}", ws.kind, ws.process.pid, err);
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) if entries.is_empty() => Err(err),
        _ => Ok(entries),
    }
}
