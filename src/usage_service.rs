// Live per-application rankings and the per-tick history write.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::aggregator::aggregate;
use crate::error::UsageError;
use crate::history_repo::HistoryStore;
use crate::identity::AppIdentities;
use crate::models::{AggregatedAppUsage, AppUsageEntry, AppUsageHistory, MetricKind};
use crate::normalizer;
use crate::sources::{MetricSources, SourceSelection, source_name};

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Persist only identities that appear in the identity table.
    pub known_apps_only: bool,
    /// Upper bound for one application's history write.
    pub write_timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            known_apps_only: false,
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of one `record_tick`, counted per application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// The process snapshot failed; nothing was aggregated or written.
    pub skipped: bool,
    pub apps_recorded: usize,
    pub apps_failed: usize,
}

impl TickReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

pub struct UsageService {
    sources: MetricSources,
    identities: Arc<AppIdentities>,
    history: Arc<dyn HistoryStore>,
    options: ServiceOptions,
}

impl UsageService {
    pub fn new(
        sources: MetricSources,
        identities: Arc<AppIdentities>,
        history: Arc<dyn HistoryStore>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            sources,
            identities,
            history,
            options,
        }
    }

    pub async fn get_cpu_usage(&self) -> Result<Vec<AppUsageEntry>, UsageError> {
        self.ranking(MetricKind::Cpu).await
    }

    pub async fn get_memory_usage(&self) -> Result<Vec<AppUsageEntry>, UsageError> {
        self.ranking(MetricKind::Memory).await
    }

    pub async fn get_disk_usage(&self) -> Result<Vec<AppUsageEntry>, UsageError> {
        self.ranking(MetricKind::Disk).await
    }

    pub async fn get_network_usage(&self) -> Result<Vec<AppUsageEntry>, UsageError> {
        self.ranking(MetricKind::Network).await
    }

    /// Top-20 ranking for `kind` from a fresh pass. Fails, rather than
    /// returning a partial ranking, if the snapshot or the metric's own
    /// source is unavailable.
    #[instrument(skip(self), fields(operation = "ranking"))]
    pub async fn ranking(&self, kind: MetricKind) -> Result<Vec<AppUsageEntry>, UsageError> {
        let usages = self.current(kind).await?;
        Ok(normalizer::rank(kind, &usages))
    }

    /// Raw per-application aggregates for `kind` from a fresh pass.
    pub async fn current(&self, kind: MetricKind) -> Result<Vec<AggregatedAppUsage>, UsageError> {
        let pass = self
            .sources
            .collect(SourceSelection::for_metric(kind))
            .await?;
        if !pass.has_metric(kind) {
            return Err(UsageError::unavailable(
                source_name(kind),
                "no data this pass (failed or timed out)",
            ));
        }
        Ok(aggregate(&pass.processes, &pass.metrics, &self.identities))
    }

    /// Samples every source once and appends each application's non-zero
    /// values to its history. A failed snapshot skips the tick; a failed
    /// write only drops that application's points.
    #[instrument(skip(self), fields(operation = "record_tick"))]
    pub async fn record_tick(&self) -> TickReport {
        let started = Instant::now();
        let pass = match self.sources.collect(SourceSelection::ALL).await {
            Ok(pass) => pass,
            Err(e) => {
                warn!(error = %e, operation = "snapshot", "process snapshot failed; tick skipped");
                return TickReport::skipped();
            }
        };
        let timestamp = chrono::Utc::now().timestamp_millis();
        let usages = aggregate(&pass.processes, &pass.metrics, &self.identities);

        let mut report = TickReport::default();
        for usage in &usages {
            if self.options.known_apps_only && !self.identities.is_known(&usage.name) {
                continue;
            }
            let points = normalizer::history_values(usage);
            if points.is_empty() {
                continue;
            }
            let write = self.history.upsert_points(&usage.name, timestamp, &points);
            match tokio::time::timeout(self.options.write_timeout, write).await {
                Ok(Ok(())) => report.apps_recorded += 1,
                Ok(Err(e)) => {
                    warn!(app = %usage.name, error = %e, "history write failed; dropped for this tick");
                    report.apps_failed += 1;
                }
                Err(_) => {
                    let e = UsageError::persistence(
                        &usage.name,
                        format!("timed out after {} ms", self.options.write_timeout.as_millis()),
                    );
                    warn!(app = %usage.name, error = %e, "history write failed; dropped for this tick");
                    report.apps_failed += 1;
                }
            }
        }

        info!(
            apps_recorded = report.apps_recorded,
            apps_failed = report.apps_failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tick recorded"
        );
        report
    }

    pub async fn get_history(&self, app: &str) -> Result<Option<AppUsageHistory>, UsageError> {
        self.history.get_history(app).await
    }

    pub async fn list_applications(&self) -> Result<Vec<String>, UsageError> {
        self.history.list_applications().await
    }

    pub fn identities(&self) -> &AppIdentities {
        &self.identities
    }
}
