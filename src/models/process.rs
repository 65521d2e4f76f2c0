// Per-process records and the per-PID metric maps reported by each source.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One live OS process as reported by the snapshot provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }

    /// False for invalid entries and OS bookkeeping pseudo-processes ("System", "Idle", ...).
    pub fn is_observable(&self) -> bool {
        if self.pid == 0 || self.name.is_empty() {
            return false;
        }
        let lower = self.name.to_lowercase();
        !lower.contains("system") && !lower.contains("idle")
    }
}

/// CPU/memory reading for one PID. A field is `None` when the source could not read it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMemorySample {
    pub cpu_percent: Option<f64>,
    pub memory_bytes: Option<u64>,
}

impl CpuMemorySample {
    /// Non-finite CPU readings are treated as missing.
    pub fn new(cpu_percent: f64, memory_bytes: u64) -> Self {
        Self {
            cpu_percent: cpu_percent.is_finite().then_some(cpu_percent),
            memory_bytes: Some(memory_bytes),
        }
    }
}

/// Cumulative disk I/O counters for one PID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoSample {
    pub read_bytes: Option<u64>,
    pub write_bytes: Option<u64>,
}

impl DiskIoSample {
    pub fn new(read_bytes: u64, write_bytes: u64) -> Self {
        Self {
            read_bytes: Some(read_bytes),
            write_bytes: Some(write_bytes),
        }
    }
}

pub type CpuMemoryMap = HashMap<u32, CpuMemorySample>;
pub type DiskIoMap = HashMap<u32, DiskIoSample>;
/// PIDs holding at least one open socket.
pub type ConnectionSet = HashSet<u32>;

/// Output of the three metric sources for one pass. `None` means the whole
/// source was unavailable (failed, timed out, or not requested).
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    pub cpu_memory: Option<CpuMemoryMap>,
    pub disk_io: Option<DiskIoMap>,
    pub connections: Option<ConnectionSet>,
}

/// Everything known about one PID after joining the sources.
/// `None` always means "no data", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMetricSample {
    pub cpu_percent: Option<f64>,
    pub memory_bytes: Option<u64>,
    pub disk_read_bytes: Option<u64>,
    pub disk_write_bytes: Option<u64>,
    pub has_connection: Option<bool>,
}

impl RawMetricSample {
    pub fn join(pid: u32, metrics: &MetricSet) -> Self {
        let cpu_memory = metrics
            .cpu_memory
            .as_ref()
            .and_then(|m| m.get(&pid))
            .copied()
            .unwrap_or_default();
        let disk = metrics
            .disk_io
            .as_ref()
            .and_then(|m| m.get(&pid))
            .copied()
            .unwrap_or_default();
        Self {
            cpu_percent: cpu_memory.cpu_percent,
            memory_bytes: cpu_memory.memory_bytes,
            disk_read_bytes: disk.read_bytes,
            disk_write_bytes: disk.write_bytes,
            has_connection: metrics.connections.as_ref().map(|set| set.contains(&pid)),
        }
    }
}
