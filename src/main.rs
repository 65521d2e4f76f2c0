use anyhow::Result;
use appusage::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let app_config = config::AppConfig::load()?;
    let identities = Arc::new(app_config.identities());
    tracing::info!(entries = identities.len(), "identity table loaded");

    let sysinfo_repo = Arc::new(sysinfo_repo::SysinfoRepo::new());
    let sources = sources::MetricSources {
        processes: sysinfo_repo.clone(),
        cpu_memory: sysinfo_repo.clone(),
        disk_io: sysinfo_repo.clone(),
        connections: sysinfo_repo.clone(),
        timeout: Duration::from_millis(app_config.sampling.source_timeout_ms),
    };

    let history_repo = Arc::new(
        history_repo::HistoryRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    history_repo.init().await?;

    let service = Arc::new(usage_service::UsageService::new(
        sources,
        identities,
        history_repo,
        usage_service::ServiceOptions {
            known_apps_only: app_config.history.known_apps_only,
            write_timeout: Duration::from_millis(app_config.database.write_timeout_ms),
        },
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let scheduler_handle = worker::spawn(
        worker::SchedulerDeps {
            service,
            totals: Some(sysinfo_repo),
            shutdown_rx,
        },
        worker::SchedulerConfig {
            interval: Duration::from_secs(app_config.sampling.interval_secs),
            schedule: app_config.sampling.schedule.clone(),
            stats_log_interval: Duration::from_secs(app_config.sampling.stats_log_interval_secs),
            health: app_config.health,
        },
    );

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;
    Ok(())
}
