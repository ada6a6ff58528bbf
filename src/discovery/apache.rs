// src/discovery/apache.rs
// =============================================================================
// Apache vhost extraction.
//
// We ask Apache itself for its parsed configuration by running `httpd -S`
// (or `apache2 -S`). The part we care about looks like:
//
//   VirtualHost configuration:
//   *:80                   is a NameVirtualHost
//            default server example.com (/etc/httpd/conf.d/example.conf:1)
//            port 80 namevhost example.com (/etc/httpd/conf.d/example.conf:1)
//                    alias www.example.com
//            port 80 namevhost other.org (/etc/httpd/conf.d/other.conf:1)
//   10.0.0.5:443           secure.example.com (/etc/httpd/conf.d/ssl.conf:10)
//   ServerRoot: "/etc/httpd"
//
// Address lines set the context (ip + port) for the indented lines below
// them. The block ends at the first "Key: value" line or "Syntax OK".
// =============================================================================

use super::error::DiscoveryError;
use super::vhost::{Extraction, VhostEntry};
use super::webserver::WebserverInfo;
use log::{debug, warn};
use regex::Regex;
use std::net::IpAddr;
use std::process::Command;
use std::sync::OnceLock;

const BLOCK_START: &str = "VirtualHost configuration:";
// Apache 2.2 prints this right under BLOCK_START
const WILDCARD_HEADER: &str = "wildcard NameVirtualHosts and _default_ servers:";

struct Grammar {
    block_end: Regex,
    name_vhost_header: Regex,
    single_vhost: Regex,
    name_vhost: Regex,
    default_server: Regex,
    alias: Regex,
}

fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        let address = r"(?P<ip>\*|_default_|\[[0-9A-Fa-f:.]+\]|[0-9.]+):(?P<port>\d{1,5})";
        let source = r"\((?P<conf>[^)]+):(?P<line>\d+)\)";

        // These patterns are constants, a failure here is a programming error
        Grammar {
            block_end: Regex::new(r"^(?:[A-Z][A-Za-z ]*:\s|Syntax OK)").unwrap(),
            name_vhost_header: Regex::new(&format!(r"^{}\s+is a NameVirtualHost$", address)).unwrap(),
            single_vhost: Regex::new(&format!(r"^{}\s+(?P<domain>\S+)\s+{}$", address, source)).unwrap(),
            name_vhost: Regex::new(&format!(r"^\s+port (?P<port>\d{{1,5}}) namevhost (?P<domain>\S+)\s+{}$", source)).unwrap(),
            default_server: Regex::new(&format!(r"^\s+default server (?P<domain>\S+)\s+{}$", source)).unwrap(),
            alias: Regex::new(r"^\s+(?P<wild>wild )?alias (?P<domain>\S+)$").unwrap(),
        }
    })
}

// Runs the config dump for this Apache process and parses it
pub fn extract(webserver: &WebserverInfo) -> Result<Extraction, DiscoveryError> {
    let process = &webserver.process;
    let binary = if process.exe.as_os_str().is_empty() {
        process.name.clone()
    } else {
        process.exe.to_string_lossy().into_owned()
    };
    let command = format!("{} -S", binary);

    debug!("fetching apache vhosts with `{}` (pid {})", command, process.pid);
    let output = Command::new(&binary)
        .arg("-S")
        .output()
        .map_err(|source| DiscoveryError::VhostFetch { command: command.clone(), source })?;

    // Older Apache versions print the vhost dump on stderr
    let mut dump = String::from_utf8_lossy(&output.stdout).into_owned();
    dump.push('\n');
    dump.push_str(&String::from_utf8_lossy(&output.stderr));

    let fallback_ip = Some(process.local_ip).filter(is_concrete);
    let extraction = parse_dump(&dump, fallback_ip).map_err(|err| match err {
        DiscoveryError::VhostInvalid { .. } => DiscoveryError::VhostInvalid { command: command.clone() },
        other => other,
    })?;

    for warning in &extraction.warnings {
        warn!("{}: {}", command, warning);
    }
    Ok(extraction)
}

/// Parses `-S` output into vhost entries.
///
/// `fallback_ip` is used for vhosts bound to a wildcard address.
pub fn parse_dump(dump: &str, fallback_ip: Option<IpAddr>) -> Result<Extraction, DiscoveryError> {
    let grammar = grammar();

    let mut lines = dump.lines().enumerate().skip_while(|(_, line)| line.trim() != BLOCK_START);
    if lines.next().is_none() {
        return Err(DiscoveryError::VhostInvalid { command: "apache -S".to_string() });
    }

    let mut extraction = Extraction::default();
    // (ip, port) from the last address line, and the port of the last vhost
    let mut context: Option<(Option<IpAddr>, u16)> = None;
    let mut last_port: Option<u16> = None;

    for (index, line) in lines {
        let line_no = index + 1;
        if line.trim().is_empty() || line.trim() == WILDCARD_HEADER {
            continue;
        }
        if grammar.block_end.is_match(line) {
            break;
        }

        let parse_error = || DiscoveryError::VhostParse { line_no, line: line.to_string() };

        let parsed: Option<(&str, u16, Option<IpAddr>)> = if let Some(caps) = grammar.name_vhost_header.captures(line) {
            let port = caps["port"].parse().ok();
            context = port.map(|port| (address_ip(&caps["ip"], fallback_ip), port));
            if context.is_none() {
                extraction.warnings.push(parse_error());
            }
            continue;
        } else if let Some(caps) = grammar.single_vhost.captures(line) {
            let port = caps["port"].parse().ok();
            let ip = address_ip(&caps["ip"], fallback_ip);
            context = port.map(|port| (ip, port));
            port.map(|port| (caps.name("domain").map_or("", |m| m.as_str()), port, ip))
        } else if let Some(caps) = grammar.name_vhost.captures(line) {
            let port = caps["port"].parse().ok();
            let ip = context.and_then(|(ip, _)| ip).or(fallback_ip);
            port.map(|port| (caps.name("domain").map_or("", |m| m.as_str()), port, ip))
        } else if let Some(caps) = grammar.default_server.captures(line) {
            context.map(|(ip, port)| (caps.name("domain").map_or("", |m| m.as_str()), port, ip))
        } else if let Some(caps) = grammar.alias.captures(line) {
            if caps.name("wild").is_some() {
                debug!("ignoring wildcard alias on line {}", line_no);
                continue;
            }
            let ip = context.and_then(|(ip, _)| ip).or(fallback_ip);
            last_port.map(|port| (caps.name("domain").map_or("", |m| m.as_str()), port, ip))
        } else {
            None
        };

        let entry = parsed.and_then(|(domain, port, ip)| {
            last_port = Some(port);
            VhostEntry::new(domain, port, ip)
        });

        match entry {
            Some(entry) => {
                if !extraction.entries.contains(&entry) {
                    extraction.entries.push(entry);
                }
            }
            None => extraction.warnings.push(parse_error()),
        }
    }

    if extraction.entries.is_empty() {
        return Err(DiscoveryError::VhostNoEntries { kind: "apache".to_string() });
    }

    Ok(extraction)
}

// "*" and "_default_" bind every address; use the listener's own address
// instead when we know it
fn address_ip(raw: &str, fallback: Option<IpAddr>) -> Option<IpAddr> {
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()
        .filter(is_concrete)
        .or(fallback)
}

fn is_concrete(ip: &IpAddr) -> bool {
    !ip.is_unspecified()
}
