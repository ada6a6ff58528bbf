// src/discovery/procfs.rs
// =============================================================================
// Paths into the host's kernel and account data.
//
// Everything discovery reads lives under one filesystem root. On a real host
// that root is "/", in tests it is a temporary directory laid out like /proc.
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        ProcFs::new("/")
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProcFs { root: root.into() }
    }

    /// /proc/net/<name>, e.g. "tcp" or "tcp6"
    pub fn net_table(&self, name: &str) -> PathBuf {
        self.root.join("proc").join("net").join(name)
    }

    pub fn passwd(&self) -> PathBuf {
        self.root.join("etc").join("passwd")
    }

    pub fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join("proc").join(pid.to_string())
    }

    /// Lists every numeric directory under /proc.
    /// An unreadable /proc yields an empty list.
    pub fn pids(&self) -> Vec<u32> {
        let entries = match fs::read_dir(self.root.join("proc")) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut pids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Reads a symlink, returning an empty path when it can't be read
    pub fn read_link(path: &Path) -> PathBuf {
        fs::read_link(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pids_only_numeric() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1", "42", "self", "net", "7"] {
            fs::create_dir_all(dir.path().join("proc").join(name)).unwrap();
        }

        let procfs = ProcFs::new(dir.path());
        assert_eq!(procfs.pids(), vec![1, 7, 42]);
    }

    #[test]
    fn test_missing_proc_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProcFs::new(dir.path()).pids().is_empty());
    }
}
