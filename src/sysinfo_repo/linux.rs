// Linux socket ownership: /proc/net/{tcp,tcp6,udp,udp6} inodes matched
// against /proc/<pid>/fd links of the form `socket:[inode]`.

#[cfg(any(target_os = "linux", test))]
use std::collections::HashSet;

use crate::models::ConnectionSet;

#[cfg(target_os = "linux")]
const PROC_NET_TABLES: [&str; 4] = [
    "/proc/net/tcp",
    "/proc/net/tcp6",
    "/proc/net/udp",
    "/proc/net/udp6",
];

/// PIDs among `pids` that own at least one socket listed in /proc/net.
/// Fails only when none of the socket tables can be read; unreadable fd
/// directories (exited process, permission denied) just omit that PID.
#[cfg(target_os = "linux")]
pub(super) fn socket_owners(pids: &[u32]) -> std::io::Result<ConnectionSet> {
    let mut inodes = HashSet::new();
    let mut last_err = None;
    let mut tables_read = 0;
    for path in PROC_NET_TABLES {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tables_read += 1;
                inodes.extend(parse_socket_inodes(&content));
            }
            Err(e) => last_err = Some(e),
        }
    }
    if tables_read == 0 {
        return Err(last_err.unwrap_or_else(|| std::io::Error::other("no /proc/net tables")));
    }

    let mut owners = ConnectionSet::new();
    for &pid in pids {
        let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", pid)) else {
            continue;
        };
        for entry in entries.flatten() {
            if let Ok(link) = std::fs::read_link(entry.path())
                && let Some(inode) = parse_socket_link(&link.to_string_lossy())
                && inodes.contains(&inode)
            {
                owners.insert(pid);
                break;
            }
        }
    }
    Ok(owners)
}

#[cfg(not(target_os = "linux"))]
pub(super) fn socket_owners(_pids: &[u32]) -> std::io::Result<ConnectionSet> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "per-process connections are only read from /proc",
    ))
}

/// Whether `/proc/<pid>/io` can be opened. sysinfo leaves the disk counters
/// at zero when it cannot read that file, so callers omit such PIDs.
#[cfg(target_os = "linux")]
pub(super) fn io_counters_readable(pid: u32) -> bool {
    std::fs::File::open(format!("/proc/{}/io", pid)).is_ok()
}

#[cfg(not(target_os = "linux"))]
pub(super) fn io_counters_readable(_pid: u32) -> bool {
    true
}

/// Socket inodes from one /proc/net table (header skipped, inode 0 ignored).
#[cfg(any(target_os = "linux", test))]
pub(super) fn parse_socket_inodes(content: &str) -> HashSet<u64> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            fields[9].parse::<u64>().ok().filter(|inode| *inode != 0)
        })
        .collect()
}

/// "socket:[12345]" -> 12345
#[cfg(any(target_os = "linux", test))]
pub(super) fn parse_socket_link(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
