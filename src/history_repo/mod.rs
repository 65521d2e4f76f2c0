// SQLite history: one row per application, one versioned blob per metric series.

mod blob;

use crate::error::UsageError;
use crate::models::{AppUsageHistory, MetricKind};
use futures_util::future::BoxFuture;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Per-application rolling history keyed by canonical name.
pub trait HistoryStore: Send + Sync {
    /// Appends every positive `(kind, value)` at `timestamp` to `app`'s record,
    /// creating it if needed. All points land together or none do.
    fn upsert_points<'a>(
        &'a self,
        app: &'a str,
        timestamp: i64,
        points: &'a [(MetricKind, f64)],
    ) -> BoxFuture<'a, Result<(), UsageError>>;

    fn get_history<'a>(
        &'a self,
        app: &'a str,
    ) -> BoxFuture<'a, Result<Option<AppUsageHistory>, UsageError>>;

    fn list_applications(&self) -> BoxFuture<'_, Result<Vec<String>, UsageError>>;

    /// Single-point form of `upsert_points`.
    fn record<'a>(
        &'a self,
        app: &'a str,
        kind: MetricKind,
        timestamp: i64,
        value: f64,
    ) -> BoxFuture<'a, Result<(), UsageError>> {
        Box::pin(async move { self.upsert_points(app, timestamp, &[(kind, value)]).await })
    }
}

pub struct HistoryRepo {
    pool: SqlitePool,
    /// Serializes read-modify-write of records within this process.
    write_lock: tokio::sync::Mutex<()>,
}

impl HistoryRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_usage (
                name TEXT PRIMARY KEY,
                cpu_data BLOB NOT NULL,
                memory_data BLOB NOT NULL,
                disk_data BLOB NOT NULL,
                network_data BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, points), fields(repo = "history", operation = "upsert", points_count = points.len()))]
    pub async fn upsert(
        &self,
        app: &str,
        timestamp: i64,
        points: &[(MetricKind, f64)],
    ) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT name, cpu_data, memory_data, disk_data, network_data FROM app_usage WHERE name = $1",
        )
        .bind(app)
        .fetch_optional(&mut *tx)
        .await?;
        // A series that cannot be decoded fails the write instead of being
        // overwritten with an empty one.
        let mut history = match row {
            Some(row) => Self::parse_row_strict(&row)?,
            None => AppUsageHistory::new(app),
        };

        let mut stored = 0;
        for &(kind, value) in points {
            if history.record(kind, timestamp, value) {
                stored += 1;
            }
        }
        if stored == 0 {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO app_usage (name, cpu_data, memory_data, disk_data, network_data, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(name) DO UPDATE SET
                cpu_data = excluded.cpu_data,
                memory_data = excluded.memory_data,
                disk_data = excluded.disk_data,
                network_data = excluded.network_data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(app)
        .bind(blob::encode_series(&history.cpu)?)
        .bind(blob::encode_series(&history.memory)?)
        .bind(blob::encode_series(&history.disk)?)
        .bind(blob::encode_series(&history.network)?)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "history", operation = "load"))]
    pub async fn load(&self, app: &str) -> anyhow::Result<Option<AppUsageHistory>> {
        let row = sqlx::query(
            "SELECT name, cpu_data, memory_data, disk_data, network_data FROM app_usage WHERE name = $1",
        )
        .bind(app)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::parse_row(&row)).transpose()
    }

    /// Application names, most recently updated first.
    pub async fn names(&self) -> anyhow::Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM app_usage ORDER BY updated_at DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    fn parse_row_strict(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<AppUsageHistory> {
        let name: String = row.try_get("name")?;
        let mut history = AppUsageHistory::new(name);
        for kind in MetricKind::ALL {
            let data: Vec<u8> = row.try_get(Self::column(kind))?;
            let series = blob::try_decode_series(&data)
                .map_err(|e| anyhow::anyhow!("{} series of {}: {}", kind, history.name, e))?;
            *history.series_mut(kind) = series;
        }
        Ok(history)
    }

    fn column(kind: MetricKind) -> &'static str {
        match kind {
            MetricKind::Cpu => "cpu_data",
            MetricKind::Memory => "memory_data",
            MetricKind::Disk => "disk_data",
            MetricKind::Network => "network_data",
        }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<AppUsageHistory> {
        let name: String = row.try_get("name")?;
        let cpu_data: Vec<u8> = row.try_get("cpu_data")?;
        let memory_data: Vec<u8> = row.try_get("memory_data")?;
        let disk_data: Vec<u8> = row.try_get("disk_data")?;
        let network_data: Vec<u8> = row.try_get("network_data")?;
        Ok(AppUsageHistory {
            name,
            cpu: blob::decode_series(&cpu_data),
            memory: blob::decode_series(&memory_data),
            disk: blob::decode_series(&disk_data),
            network: blob::decode_series(&network_data),
        })
    }
}

impl HistoryStore for HistoryRepo {
    fn upsert_points<'a>(
        &'a self,
        app: &'a str,
        timestamp: i64,
        points: &'a [(MetricKind, f64)],
    ) -> BoxFuture<'a, Result<(), UsageError>> {
        Box::pin(async move {
            self.upsert(app, timestamp, points)
                .await
                .map_err(|e| UsageError::persistence(app, e))
        })
    }

    fn get_history<'a>(
        &'a self,
        app: &'a str,
    ) -> BoxFuture<'a, Result<Option<AppUsageHistory>, UsageError>> {
        Box::pin(async move {
            self.load(app)
                .await
                .map_err(|e| UsageError::HistoryRead(e.to_string()))
        })
    }

    fn list_applications(&self) -> BoxFuture<'_, Result<Vec<String>, UsageError>> {
        Box::pin(async move {
            self.names()
                .await
                .map_err(|e| UsageError::HistoryRead(e.to_string()))
        })
    }
}
