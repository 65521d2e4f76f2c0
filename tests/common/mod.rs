// Shared test helpers: scripted sources and an in-memory history store.
#![allow(dead_code)]

use appusage::error::UsageError;
use appusage::history_repo::HistoryStore;
use appusage::identity::AppIdentities;
use appusage::models::*;
use appusage::sources::*;
use appusage::usage_service::{ServiceOptions, UsageService};
use futures_util::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted response: `Ok(data)`, `Err(reason)` (source unavailable) or a hang.
#[derive(Clone)]
pub enum Script<T> {
    Ok(T),
    Fail(&'static str),
    Hang,
}

async fn play<T: Clone>(name: &'static str, script: &Script<T>) -> Result<T, UsageError> {
    match script {
        Script::Ok(data) => Ok(data.clone()),
        Script::Fail(reason) => Err(UsageError::unavailable(name, reason)),
        Script::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(UsageError::unavailable(name, "hung"))
        }
    }
}

pub struct FakeProcesses(pub Script<Vec<ProcessRecord>>);

impl ProcessSnapshotProvider for FakeProcesses {
    fn snapshot(&self) -> BoxFuture<'_, Result<Vec<ProcessRecord>, UsageError>> {
        Box::pin(async move {
            let all = play("process", &self.0).await?;
            Ok(all.into_iter().filter(ProcessRecord::is_observable).collect())
        })
    }
}

pub struct FakeCpuMemory(pub Script<CpuMemoryMap>);

impl CpuMemorySource for FakeCpuMemory {
    fn sample<'a>(&'a self, _pids: &'a [u32]) -> BoxFuture<'a, Result<CpuMemoryMap, UsageError>> {
        Box::pin(play("cpu_memory", &self.0))
    }
}

pub struct FakeDiskIo(pub Script<DiskIoMap>);

impl DiskIoSource for FakeDiskIo {
    fn sample<'a>(&'a self, _pids: &'a [u32]) -> BoxFuture<'a, Result<DiskIoMap, UsageError>> {
        Box::pin(play("disk_io", &self.0))
    }
}

pub struct FakeConnections(pub Script<ConnectionSet>);

impl ConnectionSource for FakeConnections {
    fn sample<'a>(&'a self, _pids: &'a [u32]) -> BoxFuture<'a, Result<ConnectionSet, UsageError>> {
        Box::pin(play("connections", &self.0))
    }
}

pub fn procs(list: &[(u32, &str)]) -> Vec<ProcessRecord> {
    list.iter().map(|(pid, name)| ProcessRecord::new(*pid, *name)).collect()
}

pub fn cpu_mem(list: &[(u32, f64, u64)]) -> CpuMemoryMap {
    list.iter()
        .map(|(pid, cpu, mem)| (*pid, CpuMemorySample::new(*cpu, *mem)))
        .collect()
}

pub fn disk(list: &[(u32, u64, u64)]) -> DiskIoMap {
    list.iter()
        .map(|(pid, read, write)| (*pid, DiskIoSample::new(*read, *write)))
        .collect()
}

pub fn conns(pids: &[u32]) -> ConnectionSet {
    pids.iter().copied().collect()
}

pub struct SourcesBuilder {
    pub processes: Script<Vec<ProcessRecord>>,
    pub cpu_memory: Script<CpuMemoryMap>,
    pub disk_io: Script<DiskIoMap>,
    pub connections: Script<ConnectionSet>,
    pub timeout: Duration,
}

impl SourcesBuilder {
    pub fn new(processes: Vec<ProcessRecord>) -> Self {
        Self {
            processes: Script::Ok(processes),
            cpu_memory: Script::Ok(HashMap::new()),
            disk_io: Script::Ok(HashMap::new()),
            connections: Script::Ok(HashSet::new()),
            timeout: Duration::from_millis(200),
        }
    }

    pub fn build(self) -> MetricSources {
        MetricSources {
            processes: Arc::new(FakeProcesses(self.processes)),
            cpu_memory: Arc::new(FakeCpuMemory(self.cpu_memory)),
            disk_io: Arc::new(FakeDiskIo(self.disk_io)),
            connections: Arc::new(FakeConnections(self.connections)),
            timeout: self.timeout,
        }
    }
}

/// In-memory store; writes for names in `failing` are rejected.
#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String, AppUsageHistory>>,
    pub failing: HashSet<String>,
    pub writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> HashMap<String, AppUsageHistory> {
        self.records.lock().unwrap().clone()
    }
}

impl HistoryStore for MemoryStore {
    fn upsert_points<'a>(
        &'a self,
        app: &'a str,
        timestamp: i64,
        points: &'a [(MetricKind, f64)],
    ) -> BoxFuture<'a, Result<(), UsageError>> {
        Box::pin(async move {
            *self.writes.lock().unwrap() += 1;
            if self.failing.contains(app) {
                return Err(UsageError::persistence(app, "store rejected write"));
            }
            let mut records = self.records.lock().unwrap();
            let mut history = records
                .get(app)
                .cloned()
                .unwrap_or_else(|| AppUsageHistory::new(app));
            let mut stored = false;
            for &(kind, value) in points {
                stored |= history.record(kind, timestamp, value);
            }
            if stored {
                records.insert(app.to_string(), history);
            }
            Ok(())
        })
    }

    fn get_history<'a>(
        &'a self,
        app: &'a str,
    ) -> BoxFuture<'a, Result<Option<AppUsageHistory>, UsageError>> {
        Box::pin(async move { Ok(self.records.lock().unwrap().get(app).cloned()) })
    }

    fn list_applications(&self) -> BoxFuture<'_, Result<Vec<String>, UsageError>> {
        Box::pin(async move {
            let mut names: Vec<String> = self.records.lock().unwrap().keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }
}

pub fn service(sources: MetricSources, store: Arc<MemoryStore>) -> UsageService {
    UsageService::new(
        sources,
        Arc::new(AppIdentities::builtin()),
        store,
        ServiceOptions::default(),
    )
}

/// Parses "12.34%" / "0%" / "1.50 MB" into the leading number.
pub fn numeric(value: &str) -> f64 {
    value
        .split(|c: char| c == '%' || c == ' ')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(f64::NAN)
}
