// Sampling scheduler: one aggregate-and-persist tick per period.
// The tick runs inside the loop body, so ticks never overlap; a tick that
// overruns delays the next one and missed periods are not replayed.

use crate::health::HealthThresholds;
use crate::sysinfo_repo::SysinfoRepo;
use crate::usage_service::UsageService;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::Instrument;

pub struct SchedulerDeps {
    pub service: Arc<UsageService>,
    /// Source of the machine-wide totals logged with the stats line.
    pub totals: Option<Arc<SysinfoRepo>>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct SchedulerConfig {
    pub interval: Duration,
    /// Cron expression (local time); takes precedence over `interval`.
    pub schedule: Option<String>,
    pub stats_log_interval: Duration,
    pub health: HealthThresholds,
}

enum Trigger {
    Every(Interval),
    Cron(cron::Schedule),
}

impl Trigger {
    fn new(config: &SchedulerConfig) -> Self {
        if let Some(ref expr) = config.schedule {
            match cron::Schedule::from_str(expr) {
                Ok(schedule) => return Trigger::Cron(schedule),
                Err(e) => {
                    tracing::warn!(cron = %expr, error = %e, "invalid sampling schedule; using fixed interval");
                }
            }
        }
        let mut every = interval(config.interval);
        every.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Trigger::Every(every)
    }

    async fn fire(&mut self) {
        match self {
            Trigger::Every(every) => {
                every.tick().await;
            }
            Trigger::Cron(schedule) => {
                let now = chrono::Local::now();
                match schedule.after(&now).next() {
                    Some(next) => {
                        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                        tokio::time::sleep(delay).await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(3600)).await,
                }
            }
        }
    }
}

pub fn spawn(deps: SchedulerDeps, config: SchedulerConfig) -> tokio::task::JoinHandle<()> {
    let SchedulerDeps {
        service,
        totals,
        mut shutdown_rx,
    } = deps;

    let scheduler_span = tracing::span!(
        tracing::Level::DEBUG,
        "scheduler",
        interval_ms = config.interval.as_millis() as u64
    );

    tokio::spawn(async move {
        let mut trigger = Trigger::new(&config);
        let mut stats_log_tick = interval(config.stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut ticks_run: u64 = 0;
        let mut ticks_skipped: u64 = 0;
        let mut apps_recorded_total: u64 = 0;
        let mut apps_failed_total: u64 = 0;

        loop {
            tokio::select! {
                _ = trigger.fire() => {
                    let report = service.record_tick().await;
                    if report.skipped {
                        ticks_skipped += 1;
                    } else {
                        ticks_run += 1;
                    }
                    apps_recorded_total += report.apps_recorded as u64;
                    apps_failed_total += report.apps_failed as u64;
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Scheduler shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ticks_run,
                        ticks_skipped,
                        apps_recorded_total,
                        apps_failed_total,
                        "scheduler stats"
                    );
                    if let Some(repo) = &totals {
                        match repo.get_system_totals(config.health).await {
                            Ok(t) => tracing::info!(
                                cpu_percent = t.cpu.usage_percent,
                                cpu_health = ?t.cpu.health,
                                memory_used_gb = t.memory.used_gb,
                                memory_total_gb = t.memory.total_gb,
                                memory_health = ?t.memory.health,
                                "system totals"
                            ),
                            Err(e) => tracing::warn!(
                                error = %e,
                                operation = "get_system_totals",
                                "system totals failed"
                            ),
                        }
                    }
                }
            }
        }
    }
    .instrument(scheduler_span))
}
