// src/discovery/socket.rs
// =============================================================================
// Reads the kernel's TCP socket tables (/proc/net/tcp and /proc/net/tcp6).
//
// Each row looks like:
//
//   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//    0: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 12345 ...
//
// Addresses are hex. The kernel prints each 32-bit word of the address in
// host (little-endian) order, so every word has to be byte-swapped back:
// - IPv4 is a single word:  0100007F -> 127.0.0.1
// - IPv6 is four words:     00000000000000000000000001000000 -> ::1
// Ports are plain big-endian hex.
// =============================================================================

use super::error::DiscoveryError;
use super::procfs::ProcFs;
use log::debug;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Kernel TCP state code for a listening socket
pub const TCP_LISTEN: u8 = 0x0A;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub peer_ip: IpAddr,
    pub peer_port: u16,
    pub state: u8,
    pub uid: u32,
    pub inode: u64,
}

impl SocketEntry {
    pub fn is_listening(&self) -> bool {
        self.state == TCP_LISTEN
    }
}

// Reads both socket tables. tcp6 is optional (IPv6 may be disabled), but if
// neither table can be read there is nothing to discover from.
pub fn read_socket_table(procfs: &ProcFs) -> Result<Vec<SocketEntry>, DiscoveryError> {
    let mut entries = Vec::new();
    let mut first_error = None;
    let mut any_read = false;

    for name in ["tcp", "tcp6"] {
        let path = procfs.net_table(name);
        match fs::read_to_string(&path) {
            Ok(text) => {
                any_read = true;
                let parsed = parse_socket_table(&text);
                debug!("read {} sockets from {}", parsed.len(), path.display());
                entries.extend(parsed);
            }
            Err(source) => {
                debug!("unable to read {}: {}", path.display(), source);
                if first_error.is_none() {
                    first_error = Some(DiscoveryError::NoSocketData { path, source });
                }
            }
        }
    }

    match (any_read, first_error) {
        (false, Some(err)) => Err(err),
        _ => Ok(entries),
    }
}

/// Parses the text of one socket table, skipping the header, blank lines and
/// any row that doesn't have the expected shape.
pub fn parse_socket_table(text: &str) -> Vec<SocketEntry> {
    text.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = parse_socket_line(line);
            if entry.is_none() {
                debug!("skipping malformed socket row: {:?}", line);
            }
            entry
        })
        .collect()
}

fn parse_socket_line(line: &str) -> Option<SocketEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 10 {
        return None;
    }

    let (local_ip, local_port) = parse_address(fields[1])?;
    let (peer_ip, peer_port) = parse_address(fields[2])?;

    Some(SocketEntry {
        local_ip,
        local_port,
        peer_ip,
        peer_port,
        state: u8::from_str_radix(fields[3], 16).ok()?,
        uid: fields[7].parse().ok()?,
        inode: fields[9].parse().ok()?,
    })
}

// "0100007F:0CEA" -> (127.0.0.1, 3306)
fn parse_address(field: &str) -> Option<(IpAddr, u16)> {
    let (ip, port) = field.split_once(':')?;
    let ip = decode_ip(ip)?;
    let port = u16::from_str_radix(port, 16).ok()?;
    Some((ip, port))
}

pub fn decode_ip(hex: &str) -> Option<IpAddr> {
    match hex.len() {
        8 => decode_ipv4(hex).map(IpAddr::V4),
        32 => decode_ipv6(hex).map(IpAddr::V6),
        _ => None,
    }
}

pub fn decode_ipv4(hex: &str) -> Option<Ipv4Addr> {
    let word = u32::from_str_radix(hex, 16).ok()?;
    Some(Ipv4Addr::from(word.to_le_bytes()))
}

pub fn decode_ipv6(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 || !hex.is_ascii() {
        return None;
    }

    let mut octets = [0u8; 16];
    for (i, chunk) in octets.chunks_mut(4).enumerate() {
        let word = u32::from_str_radix(&hex[i * 8..i * 8 + 8], 16).ok()?;
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    Some(Ipv6Addr::from(octets))
}

#[cfg(test)]
pub fn encode_ipv4(ip: Ipv4Addr) -> String {
    format!("{:08X}", u32::from_le_bytes(ip.octets()))
}

#[cfg(test)]
pub fn encode_ipv6(ip: Ipv6Addr) -> String {
    ip.octets()
        .chunks(4)
        .map(|chunk| format!("{:08X}", u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect()
}
