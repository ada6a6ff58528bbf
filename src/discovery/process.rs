// src/discovery/process.rs
// =============================================================================
// Maps sockets to the processes that own them.
//
// How it works:
// 1. Walk every /proc/<pid>/fd/<n> link once. Socket fds link to
//    "socket:[<inode>]", which gives us an inode -> pid index.
// 2. For each socket, look up its inode in that index.
// 3. Resolve the pid's exe (/proc/<pid>/exe), short name (/proc/<pid>/comm)
//    and the socket owner's user name (uid -> /etc/passwd).
//
// Processes come and go, and most of /proc is unreadable without root, so any
// field we can't read is simply left empty.
// =============================================================================

use super::procfs::ProcFs;
use super::socket::SocketEntry;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

/// A point-in-time snapshot of one process bound to one socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub pid: u32,
    pub exe: PathBuf,
    pub name: String,
    pub user: String,
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub peer_ip: IpAddr,
    pub peer_port: u16,
}

impl Process {
    /// File name of the executable, if the exe link could be read
    pub fn exe_name(&self) -> Option<&str> {
        self.exe.file_name()?.to_str()
    }
}

pub struct ProcessCorrelator<'a> {
    procfs: &'a ProcFs,
    inodes: HashMap<u64, u32>,
    users: HashMap<u32, String>,
}

impl<'a> ProcessCorrelator<'a> {
    /// Builds the inode index and user table up front; correlating any
    /// number of sockets afterwards is a map lookup each.
    pub fn new(procfs: &'a ProcFs) -> Self {
        let inodes = index_socket_inodes(procfs);
        debug!("indexed {} socket inodes", inodes.len());

        ProcessCorrelator {
            procfs,
            inodes,
            users: load_users(procfs),
        }
    }

    pub fn owner_of(&self, inode: u64) -> Option<u32> {
        self.inodes.get(&inode).copied()
    }

    pub fn correlate(&self, sockets: &[SocketEntry]) -> Vec<Process> {
        sockets
            .iter()
            .filter_map(|socket| {
                let pid = match self.owner_of(socket.inode) {
                    Some(pid) => pid,
                    None => {
                        debug!(
                            "no process owns socket inode {} ({}:{})",
                            socket.inode, socket.local_ip, socket.local_port
                        );
                        return None;
                    }
                };

                Some(Process {
                    pid,
                    exe: ProcFs::read_link(&self.procfs.pid_dir(pid).join("exe")),
                    name: self.command_name(pid),
                    user: self.users.get(&socket.uid).cloned().unwrap_or_default(),
                    local_ip: socket.local_ip,
                    local_port: socket.local_port,
                    peer_ip: socket.peer_ip,
                    peer_port: socket.peer_port,
                })
            })
            .collect()
    }

    fn command_name(&self, pid: u32) -> String {
        fs::read_to_string(self.procfs.pid_dir(pid).join("comm"))
            .ok()
            .and_then(|comm| comm.lines().next().map(str::to_string))
            .unwrap_or_default()
    }
}

fn index_socket_inodes(procfs: &ProcFs) -> HashMap<u64, u32> {
    let mut index = HashMap::new();

    for pid in procfs.pids() {
        let fds = match fs::read_dir(procfs.pid_dir(pid).join("fd")) {
            Ok(fds) => fds,
            Err(_) => continue,
        };

        for fd in fds.filter_map(|fd| fd.ok()) {
            let target = ProcFs::read_link(&fd.path());
            if let Some(inode) = target.to_str().and_then(socket_inode) {
                // Lowest pid wins when a socket is shared (e.g. a forked worker)
                index.entry(inode).or_insert(pid);
            }
        }
    }

    index
}

// "socket:[12345]" -> 12345
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

fn load_users(procfs: &ProcFs) -> HashMap<u32, String> {
    let passwd = fs::read_to_string(procfs.passwd()).unwrap_or_default();

    passwd
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let uid = fields.nth(1)?.parse().ok()?;
            Some((uid, name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::os::unix::fs::symlink;
    use std::path::Path;

    fn fake_process(root: &Path, pid: u32, comm: &str, exe: &str, inodes: &[u64]) {
        let dir = root.join("proc").join(pid.to_string());
        fs::create_dir_all(dir.join("fd")).unwrap();
        fs::write(dir.join("comm"), format!("{}\n", comm)).unwrap();
        symlink(exe, dir.join("exe")).unwrap();
        symlink("/dev/null", dir.join("fd").join("0")).unwrap();
        for (i, inode) in inodes.iter().enumerate() {
            symlink(format!("socket:[{}]", inode), dir.join("fd").join((i + 3).to_string())).unwrap();
        }
    }

    fn socket(port: u16, uid: u32, inode: u64) -> SocketEntry {
        SocketEntry {
            local_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_port: port,
            peer_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            peer_port: 0,
            state: 0x0A,
            uid,
            inode,
        }
    }

    #[test]
    fn test_socket_inode() {
        assert_eq!(socket_inode("socket:[18562]"), Some(18562));
        assert_eq!(socket_inode("pipe:[18562]"), None);
        assert_eq!(socket_inode("/dev/null"), None);
        assert_eq!(socket_inode("socket:[185620"), None);
    }

    #[test]
    fn test_correlate_resolves_process() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc")).unwrap();
        fs::write(
            dir.path().join("etc").join("passwd"),
            "root:x:0:0:root:/root:/bin/bash\napache:x:48:48:Apache:/usr/share/httpd:/sbin/nologin\n",
        )
        .unwrap();
        fake_process(dir.path(), 812, "httpd", "/usr/sbin/httpd", &[18562, 18563]);
        fake_process(dir.path(), 900, "sshd", "/usr/sbin/sshd", &[20000]);

        let procfs = ProcFs::new(dir.path());
        let correlator = ProcessCorrelator::new(&procfs);
        let procs = correlator.correlate(&[socket(80, 0, 18562), socket(443, 48, 18563), socket(22, 0, 20000)]);

        assert_eq!(procs.len(), 3);
        assert_eq!(procs[0].pid, 812);
        assert_eq!(procs[0].name, "httpd");
        assert_eq!(procs[0].exe_name(), Some("httpd"));
        assert_eq!(procs[0].user, "root");
        assert_eq!(procs[1].user, "apache");
        assert_eq!(procs[1].local_port, 443);
        assert_eq!(procs[2].pid, 900);
    }

    #[test]
    fn test_unowned_socket_dropped_and_missing_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fd_dir = dir.path().join("proc").join("77").join("fd");
        fs::create_dir_all(&fd_dir).unwrap();
        symlink("socket:[5555]", fd_dir.join("4")).unwrap();

        let procfs = ProcFs::new(dir.path());
        let procs = ProcessCorrelator::new(&procfs).correlate(&[socket(80, 1000, 5555), socket(81, 0, 6666)]);

        assert_eq!(procs.len(), 1);
        assert_eq!(procs[0].pid, 77);
        assert!(procs[0].name.is_empty());
        assert!(procs[0].user.is_empty());
        assert_eq!(procs[0].exe_name(), None);
    }
}
