// Join the process list with the metric sources by PID and sum per
// canonical application identity.

use std::collections::{HashMap, HashSet};

use crate::identity::AppIdentities;
use crate::models::{AggregatedAppUsage, MetricSet, ProcessRecord, RawMetricSample};

/// One `AggregatedAppUsage` per identity, in first-seen order of the process
/// list. The process list is the join key: source entries for PIDs not in
/// `processes` are ignored, and a PID listed twice is counted once.
///
/// Every identity seen in `processes` is returned, even with all totals at
/// zero; ranking decides what to show.
pub fn aggregate(
    processes: &[ProcessRecord],
    metrics: &MetricSet,
    identities: &AppIdentities,
) -> Vec<AggregatedAppUsage> {
    let mut usages: Vec<AggregatedAppUsage> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut seen = HashSet::with_capacity(processes.len());

    for process in processes {
        if !seen.insert(process.pid) {
            continue;
        }
        let name = identities.resolve(&process.name);
        let slot = match index.get(name) {
            Some(&slot) => slot,
            None => {
                usages.push(AggregatedAppUsage::new(name));
                index.insert(name, usages.len() - 1);
                usages.len() - 1
            }
        };
        absorb(&mut usages[slot], &RawMetricSample::join(process.pid, metrics));
    }
    usages
}

/// Adds one PID's sample. Absent fields contribute nothing, not zero.
fn absorb(usage: &mut AggregatedAppUsage, sample: &RawMetricSample) {
    let mut contributed = false;

    if let Some(cpu) = sample.cpu_percent {
        usage.cpu_total += cpu;
        usage.cpu_processes += 1;
        contributed = true;
    }
    if let Some(memory) = sample.memory_bytes {
        usage.memory_total_bytes += memory;
        usage.memory_processes += 1;
        contributed = true;
    }
    if sample.disk_read_bytes.is_some() || sample.disk_write_bytes.is_some() {
        usage.disk_total_bytes +=
            sample.disk_read_bytes.unwrap_or(0) + sample.disk_write_bytes.unwrap_or(0);
        usage.disk_processes += 1;
        contributed = true;
    }
    // Presence, not socket multiplicity.
    if sample.has_connection == Some(true) {
        usage.connection_count += 1;
        usage.network_processes += 1;
        contributed = true;
    }

    if contributed {
        usage.process_count += 1;
    }
}
