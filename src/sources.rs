// Process and metric sources, plus the concurrent per-pass fan-out.
//
// The process snapshot is the join key: if it fails the pass fails. Each
// metric source is independent; a failure or timeout only removes that
// metric from the pass.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::{debug, instrument, warn};

use crate::error::UsageError;
use crate::models::{ConnectionSet, CpuMemoryMap, DiskIoMap, MetricKind, MetricSet, ProcessRecord};

/// Lists live processes, already filtered to observable applications.
pub trait ProcessSnapshotProvider: Send + Sync {
    fn snapshot(&self) -> BoxFuture<'_, Result<Vec<ProcessRecord>, UsageError>>;
}

pub trait CpuMemorySource: Send + Sync {
    fn sample<'a>(&'a self, pids: &'a [u32]) -> BoxFuture<'a, Result<CpuMemoryMap, UsageError>>;
}

pub trait DiskIoSource: Send + Sync {
    fn sample<'a>(&'a self, pids: &'a [u32]) -> BoxFuture<'a, Result<DiskIoMap, UsageError>>;
}

pub trait ConnectionSource: Send + Sync {
    fn sample<'a>(&'a self, pids: &'a [u32]) -> BoxFuture<'a, Result<ConnectionSet, UsageError>>;
}

/// Which metric sources a pass should query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSelection {
    pub cpu_memory: bool,
    pub disk_io: bool,
    pub connections: bool,
}

impl SourceSelection {
    pub const ALL: SourceSelection = SourceSelection {
        cpu_memory: true,
        disk_io: true,
        connections: true,
    };

    pub fn for_metric(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Cpu | MetricKind::Memory => SourceSelection {
                cpu_memory: true,
                ..Default::default()
            },
            MetricKind::Disk => SourceSelection {
                disk_io: true,
                ..Default::default()
            },
            MetricKind::Network => SourceSelection {
                connections: true,
                ..Default::default()
            },
        }
    }
}

/// Name used in logs and `SourceUnavailable` errors for the source behind `kind`.
pub fn source_name(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Cpu | MetricKind::Memory => "cpu_memory",
        MetricKind::Disk => "disk_io",
        MetricKind::Network => "connections",
    }
}

/// One pass worth of raw data: the authoritative process list and whatever
/// the metric sources returned.
#[derive(Debug, Clone, Default)]
pub struct SamplePass {
    pub processes: Vec<ProcessRecord>,
    pub metrics: MetricSet,
}

impl SamplePass {
    pub fn has_metric(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Cpu | MetricKind::Memory => self.metrics.cpu_memory.is_some(),
            MetricKind::Disk => self.metrics.disk_io.is_some(),
            MetricKind::Network => self.metrics.connections.is_some(),
        }
    }
}

#[derive(Clone)]
pub struct MetricSources {
    pub processes: Arc<dyn ProcessSnapshotProvider>,
    pub cpu_memory: Arc<dyn CpuMemorySource>,
    pub disk_io: Arc<dyn DiskIoSource>,
    pub connections: Arc<dyn ConnectionSource>,
    /// Upper bound for each individual source call.
    pub timeout: Duration,
}

impl MetricSources {
    /// Snapshot first, then the selected metric sources concurrently; all of
    /// them are joined before returning.
    #[instrument(skip(self), fields(operation = "collect"))]
    pub async fn collect(&self, selection: SourceSelection) -> Result<SamplePass, UsageError> {
        let processes = match tokio::time::timeout(self.timeout, self.processes.snapshot()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(UsageError::unavailable(
                    "process",
                    format!("timed out after {} ms", self.timeout.as_millis()),
                ));
            }
        };
        let pids: Vec<u32> = processes.iter().map(|p| p.pid).collect();

        let (cpu_memory, disk_io, connections) = tokio::join!(
            fetch(
                "cpu_memory",
                self.timeout,
                selection.cpu_memory.then(|| self.cpu_memory.sample(&pids)),
            ),
            fetch(
                "disk_io",
                self.timeout,
                selection.disk_io.then(|| self.disk_io.sample(&pids)),
            ),
            fetch(
                "connections",
                self.timeout,
                selection.connections.then(|| self.connections.sample(&pids)),
            ),
        );

        if let Some(map) = &cpu_memory {
            log_omitted("cpu_memory", &pids, |pid| map.contains_key(pid));
        }
        if let Some(map) = &disk_io {
            log_omitted("disk_io", &pids, |pid| map.contains_key(pid));
        }

        Ok(SamplePass {
            processes,
            metrics: MetricSet {
                cpu_memory,
                disk_io,
                connections,
            },
        })
    }
}

/// Runs one source under `timeout`. Failure and timeout both yield `None`.
async fn fetch<T, F>(name: &'static str, timeout: Duration, call: Option<F>) -> Option<T>
where
    F: Future<Output = Result<T, UsageError>>,
{
    let call = call?;
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(data)) => Some(data),
        Ok(Err(e)) => {
            warn!(source = name, error = %e, "metric source failed; metric absent this pass");
            None
        }
        Err(_) => {
            warn!(
                source = name,
                timeout_ms = timeout.as_millis() as u64,
                "metric source timed out; metric absent this pass"
            );
            None
        }
    }
}

fn log_omitted(name: &'static str, pids: &[u32], present: impl Fn(&u32) -> bool) {
    let omitted = pids.iter().filter(|pid| !present(pid)).count();
    if omitted > 0 {
        debug!(source = name, omitted, total = pids.len(), "partial data");
    }
}
