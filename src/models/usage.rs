// Per-application aggregates and the ranked rows handed to callers.

use serde::{Deserialize, Serialize};

/// Sum of per-PID metrics for one canonical identity within one pass.
///
/// Each metric stream keeps its own contributing-PID count; `process_count`
/// is the number of PIDs that contributed to any stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedAppUsage {
    pub name: String,
    pub cpu_total: f64,
    pub memory_total_bytes: u64,
    pub disk_total_bytes: u64,
    pub connection_count: u32,
    pub process_count: u32,
    pub cpu_processes: u32,
    pub memory_processes: u32,
    pub disk_processes: u32,
    pub network_processes: u32,
}

impl AggregatedAppUsage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One row of a live ranking, e.g. `{ "name": "Google Chrome", "value": "42.10%", "processCount": 7 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUsageEntry {
    pub name: String,
    pub value: String,
    pub process_count: u32,
}
