// Live rankings: CPU share of the sampled total, memory/disk in decimal MB,
// connection counts. Sorting is stable, so equal values keep aggregation order.

use crate::models::{AggregatedAppUsage, AppUsageEntry, MetricKind};

/// Maximum rows in a live ranking.
pub const TOP_N: usize = 20;

/// Decimal megabyte; displayed MB values are bytes / 1e6.
pub const BYTES_PER_MB: f64 = 1_000_000.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn rank(kind: MetricKind, usages: &[AggregatedAppUsage]) -> Vec<AppUsageEntry> {
    match kind {
        MetricKind::Cpu => cpu_shares(usages),
        MetricKind::Memory => memory_ranking(usages),
        MetricKind::Disk => disk_ranking(usages),
        MetricKind::Network => network_ranking(usages),
    }
}

/// Share of the summed CPU of every identity with a CPU reading.
/// When that sum is zero every row reads "0%".
pub fn cpu_shares(usages: &[AggregatedAppUsage]) -> Vec<AppUsageEntry> {
    let sampled: Vec<&AggregatedAppUsage> = usages.iter().filter(|u| u.cpu_processes > 0).collect();
    let total: f64 = sampled.iter().map(|u| u.cpu_total).sum();

    let mut shares: Vec<(f64, &AggregatedAppUsage)> = sampled
        .into_iter()
        .map(|u| {
            let share = if total > 0.0 {
                u.cpu_total / total * 100.0
            } else {
                0.0
            };
            (share, u)
        })
        .collect();
    shares.sort_by(|a, b| b.0.total_cmp(&a.0));

    shares
        .into_iter()
        .take(TOP_N)
        .map(|(share, u)| AppUsageEntry {
            name: u.name.clone(),
            value: if total > 0.0 {
                format!("{:.2}%", share)
            } else {
                "0%".to_string()
            },
            process_count: u.cpu_processes,
        })
        .collect()
}

pub fn memory_ranking(usages: &[AggregatedAppUsage]) -> Vec<AppUsageEntry> {
    megabyte_ranking(usages, |u| (u.memory_total_bytes, u.memory_processes))
}

pub fn disk_ranking(usages: &[AggregatedAppUsage]) -> Vec<AppUsageEntry> {
    megabyte_ranking(usages, |u| (u.disk_total_bytes, u.disk_processes))
}

/// Sorted by contributing process count, not by connection count.
pub fn network_ranking(usages: &[AggregatedAppUsage]) -> Vec<AppUsageEntry> {
    let mut rows: Vec<&AggregatedAppUsage> =
        usages.iter().filter(|u| u.network_processes > 0).collect();
    rows.sort_by(|a, b| b.network_processes.cmp(&a.network_processes));
    rows.into_iter()
        .take(TOP_N)
        .map(|u| AppUsageEntry {
            name: u.name.clone(),
            value: format!("{} connections", u.connection_count),
            process_count: u.network_processes,
        })
        .collect()
}

fn megabyte_ranking(
    usages: &[AggregatedAppUsage],
    metric: impl Fn(&AggregatedAppUsage) -> (u64, u32),
) -> Vec<AppUsageEntry> {
    let mut rows: Vec<(u64, u32, &AggregatedAppUsage)> = usages
        .iter()
        .filter_map(|u| {
            let (bytes, processes) = metric(u);
            (processes > 0).then_some((bytes, processes, u))
        })
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    rows.into_iter()
        .take(TOP_N)
        .map(|(bytes, processes, u)| AppUsageEntry {
            name: u.name.clone(),
            value: format!("{:.2} MB", bytes as f64 / BYTES_PER_MB),
            process_count: processes,
        })
        .collect()
}

/// Values persisted for one application this tick: CPU percent, memory and
/// disk in MB, connection count. Zero values are left out.
pub fn history_values(usage: &AggregatedAppUsage) -> Vec<(MetricKind, f64)> {
    [
        (MetricKind::Cpu, usage.cpu_total),
        (MetricKind::Memory, usage.memory_total_bytes as f64 / BYTES_PER_MB),
        (MetricKind::Disk, usage.disk_total_bytes as f64 / BYTES_PER_MB),
        (MetricKind::Network, usage.connection_count as f64),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_finite() && *value > 0.0)
    .collect()
}
