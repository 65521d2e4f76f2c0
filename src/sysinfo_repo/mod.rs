// Process and system metrics via sysinfo

mod linux;

use crate::error::UsageError;
use crate::health::HealthThresholds;
use crate::models::*;
use crate::normalizer::{BYTES_PER_MB, round2};
use crate::sources::{ConnectionSource, CpuMemorySource, DiskIoSource, ProcessSnapshotProvider};
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Networks, Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::instrument;

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// Each source owns its own `System` so concurrent fan-out calls never wait
/// on each other's refresh.
pub struct SysinfoRepo {
    process_sys: Arc<Mutex<System>>,
    usage_sys: Arc<Mutex<System>>,
    last_usage_refresh: Arc<Mutex<Option<Instant>>>,
    disk_sys: Arc<Mutex<System>>,
    totals_sys: Arc<Mutex<System>>,
    last_cpu_refresh: Arc<Mutex<Option<(Instant, f64)>>>,
    networks: Arc<Mutex<Networks>>,
    last_network: Arc<Mutex<Option<(String, u64, u64, Instant)>>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        Self {
            process_sys: Arc::new(Mutex::new(System::new())),
            usage_sys: Arc::new(Mutex::new(System::new())),
            last_usage_refresh: Arc::new(Mutex::new(None)),
            disk_sys: Arc::new(Mutex::new(System::new())),
            totals_sys: Arc::new(Mutex::new(System::new())),
            last_cpu_refresh: Arc::new(Mutex::new(None)),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            last_network: Arc::new(Mutex::new(None)),
        }
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "list_processes"))]
    pub async fn list_processes(&self) -> Result<Vec<ProcessRecord>, UsageError> {
        let sys = self.process_sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| UsageError::unavailable("process", format!("sysinfo lock poisoned: {e}")))?;
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing(),
            );
            if sys.processes().is_empty() {
                return Err(UsageError::unavailable("process", "OS reported no processes"));
            }
            let mut records: Vec<ProcessRecord> = sys
                .processes()
                .values()
                .filter(|p| p.thread_kind().is_none())
                .map(|p| ProcessRecord::new(p.pid().as_u32(), p.name().to_string_lossy()))
                .filter(ProcessRecord::is_observable)
                .collect();
            records.sort_by_key(|r| r.pid);
            Ok(records)
        })
        .await
        .map_err(|e| UsageError::unavailable("process", format!("sysinfo task join: {e}")))?
    }

    /// CPU percent is measured since the previous refresh of this sampler; the
    /// first call (or a call too soon after the last one) waits out
    /// `MINIMUM_CPU_UPDATE_INTERVAL` so readings are never a zero baseline.
    #[instrument(skip(self, pids), fields(repo = "sysinfo", operation = "sample_cpu_memory", pids = pids.len()))]
    pub async fn sample_cpu_memory(&self, pids: &[u32]) -> Result<CpuMemoryMap, UsageError> {
        let sys = self.usage_sys.clone();
        let last_refresh = self.last_usage_refresh.clone();
        let pids = pids.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys.lock().map_err(|e| {
                UsageError::unavailable("cpu_memory", format!("sysinfo lock poisoned: {e}"))
            })?;
            let mut last = last_refresh.lock().map_err(|e| {
                UsageError::unavailable("cpu_memory", format!("sysinfo lock poisoned: {e}"))
            })?;
            let kind = ProcessRefreshKind::nothing().with_cpu().with_memory();
            match *last {
                None => {
                    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, kind);
                    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                }
                Some(prev) => {
                    let elapsed = prev.elapsed();
                    if elapsed < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
                        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL - elapsed);
                    }
                }
            }
            sys.refresh_processes_specifics(ProcessesToUpdate::All, true, kind);
            *last = Some(Instant::now());

            Ok(pids
                .iter()
                .filter_map(|&pid| {
                    sys.process(Pid::from_u32(pid)).map(|p| {
                        (pid, CpuMemorySample::new(p.cpu_usage() as f64, p.memory()))
                    })
                })
                .collect())
        })
        .await
        .map_err(|e| UsageError::unavailable("cpu_memory", format!("sysinfo task join: {e}")))?
    }

    /// PIDs whose I/O counters cannot be read (permission denied, exited) are
    /// omitted rather than reported as zero.
    #[instrument(skip(self, pids), fields(repo = "sysinfo", operation = "sample_disk_io", pids = pids.len()))]
    pub async fn sample_disk_io(&self, pids: &[u32]) -> Result<DiskIoMap, UsageError> {
        let sys = self.disk_sys.clone();
        let pids = pids.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys.lock().map_err(|e| {
                UsageError::unavailable("disk_io", format!("sysinfo lock poisoned: {e}"))
            })?;
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing().with_disk_usage(),
            );
            Ok(pids
                .iter()
                .filter(|&&pid| linux::io_counters_readable(pid))
                .filter_map(|&pid| {
                    sys.process(Pid::from_u32(pid)).map(|p| {
                        let usage = p.disk_usage();
                        (
                            pid,
                            DiskIoSample::new(usage.total_read_bytes, usage.total_written_bytes),
                        )
                    })
                })
                .collect())
        })
        .await
        .map_err(|e| UsageError::unavailable("disk_io", format!("sysinfo task join: {e}")))?
    }

    #[instrument(skip(self, pids), fields(repo = "sysinfo", operation = "sample_connections", pids = pids.len()))]
    pub async fn sample_connections(&self, pids: &[u32]) -> Result<ConnectionSet, UsageError> {
        let pids = pids.to_vec();
        tokio::task::spawn_blocking(move || {
            linux::socket_owners(&pids).map_err(|e| UsageError::unavailable("connections", e))
        })
        .await
        .map_err(|e| UsageError::unavailable("connections", format!("task join: {e}")))?
    }

    /// Overall CPU, memory and busiest-interface network totals.
    #[instrument(skip(self, thresholds), fields(repo = "sysinfo", operation = "get_system_totals"))]
    pub async fn get_system_totals(
        &self,
        thresholds: HealthThresholds,
    ) -> anyhow::Result<SystemTotals> {
        let sys = self.totals_sys.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        let networks = self.networks.clone();
        let last_network = self.last_network.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;

            let now = Instant::now();
            let cpu_usage = {
                let mut guard = last_cpu_refresh
                    .lock()
                    .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
                let previous = *guard;
                match previous {
                    Some((prev_ts, prev_usage))
                        if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                    {
                        prev_usage
                    }
                    Some(_) => {
                        sys.refresh_cpu_usage();
                        let usage = sys.global_cpu_usage() as f64;
                        *guard = Some((now, usage));
                        usage
                    }
                    None => {
                        // First call: establish the baseline, then measure.
                        sys.refresh_cpu_usage();
                        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                        sys.refresh_cpu_usage();
                        let usage = sys.global_cpu_usage() as f64;
                        *guard = Some((Instant::now(), usage));
                        usage
                    }
                }
            }
            .clamp(0.0, 100.0);

            sys.refresh_memory();
            let total = sys.total_memory();
            let available = sys.available_memory();
            let used = total.saturating_sub(available);
            let memory_percent = if total > 0 {
                (used as f64 / total as f64) * 100.0
            } else {
                0.0
            };

            let network = {
                let mut networks = networks
                    .lock()
                    .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
                networks.refresh(true);
                let busiest = networks
                    .list()
                    .iter()
                    .filter(|(name, _)| name.as_str() != "lo")
                    .max_by_key(|(_, data)| data.total_received() + data.total_transmitted())
                    .map(|(name, data)| {
                        (name.clone(), data.total_received(), data.total_transmitted())
                    });
                busiest.map(|(name, rx, tx)| {
                    let now = Instant::now();
                    let (rx_rate, tx_rate) = match last_network.lock() {
                        Ok(mut guard) => {
                            let rates = match guard.as_ref() {
                                Some((prev_name, prev_rx, prev_tx, prev_ts))
                                    if *prev_name == name =>
                                {
                                    let dt = now.duration_since(*prev_ts).as_secs_f64();
                                    if dt > 0.0 {
                                        (
                                            rx.saturating_sub(*prev_rx) as f64 / dt,
                                            tx.saturating_sub(*prev_tx) as f64 / dt,
                                        )
                                    } else {
                                        (0.0, 0.0)
                                    }
                                }
                                _ => (0.0, 0.0),
                            };
                            *guard = Some((name.clone(), rx, tx, now));
                            rates
                        }
                        Err(_) => (0.0, 0.0),
                    };
                    NetworkTotals {
                        interface: name,
                        rx_total_mb: round2(rx as f64 / BYTES_PER_MB),
                        tx_total_mb: round2(tx as f64 / BYTES_PER_MB),
                        rx_kb_per_sec: round2(rx_rate / 1_000.0),
                        tx_kb_per_sec: round2(tx_rate / 1_000.0),
                    }
                })
            };

            Ok(SystemTotals {
                cpu: CpuTotals {
                    usage_percent: round2(cpu_usage),
                    health: thresholds.classify(cpu_usage),
                },
                memory: MemoryTotals {
                    total_gb: round2(total as f64 / BYTES_PER_GB),
                    used_gb: round2(used as f64 / BYTES_PER_GB),
                    free_gb: round2(available as f64 / BYTES_PER_GB),
                    usage_percent: round2(memory_percent),
                    health: thresholds.classify(memory_percent),
                },
                network,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

impl ProcessSnapshotProvider for SysinfoRepo {
    fn snapshot(&self) -> BoxFuture<'_, Result<Vec<ProcessRecord>, UsageError>> {
        Box::pin(self.list_processes())
    }
}

impl CpuMemorySource for SysinfoRepo {
    fn sample<'a>(&'a self, pids: &'a [u32]) -> BoxFuture<'a, Result<CpuMemoryMap, UsageError>> {
        Box::pin(self.sample_cpu_memory(pids))
    }
}

impl DiskIoSource for SysinfoRepo {
    fn sample<'a>(&'a self, pids: &'a [u32]) -> BoxFuture<'a, Result<DiskIoMap, UsageError>> {
        Box::pin(self.sample_disk_io(pids))
    }
}

impl ConnectionSource for SysinfoRepo {
    fn sample<'a>(&'a self, pids: &'a [u32]) -> BoxFuture<'a, Result<ConnectionSet, UsageError>> {
        Box::pin(self.sample_connections(pids))
    }
}
