// Machine-wide totals (overall CPU, memory, busiest network interface).

use serde::{Deserialize, Serialize};

use crate::health::HealthStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuTotals {
    pub usage_percent: f64,
    pub health: HealthStatus,
}

/// Sizes are decimal gigabytes rounded to two places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryTotals {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub usage_percent: f64,
    pub health: HealthStatus,
}

/// Totals in decimal MB; rates in KB/s since the previous read (0 on the first read).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTotals {
    pub interface: String,
    pub rx_total_mb: f64,
    pub tx_total_mb: f64,
    pub rx_kb_per_sec: f64,
    pub tx_kb_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTotals {
    pub cpu: CpuTotals,
    pub memory: MemoryTotals,
    pub network: Option<NetworkTotals>,
}
