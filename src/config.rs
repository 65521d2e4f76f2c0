use crate::health::HealthThresholds;
use crate::identity::AppIdentities;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub health: HealthThresholds,
    /// Replaces the built-in identity table when present.
    #[serde(default)]
    pub identities: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_max_pool_size() -> u32 {
    4
}

fn default_write_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Cron expression (local time). Overrides `interval_secs` when set.
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
    /// How often to log scheduler stats and system totals at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_source_timeout_ms() -> u64 {
    5_000
}

fn default_stats_log_interval_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub known_apps_only: bool,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn identities(&self) -> AppIdentities {
        match &self.identities {
            Some(table) => AppIdentities::new(table.clone()),
            None => AppIdentities::builtin(),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.write_timeout_ms > 0,
            "database.write_timeout_ms must be > 0, got {}",
            self.database.write_timeout_ms
        );
        anyhow::ensure!(
            self.sampling.interval_secs > 0,
            "sampling.interval_secs must be > 0, got {}",
            self.sampling.interval_secs
        );
        if let Some(schedule) = &self.sampling.schedule {
            cron::Schedule::from_str(schedule).map_err(|e| {
                anyhow::anyhow!("sampling.schedule is not a valid cron expression: {}", e)
            })?;
        }
        anyhow::ensure!(
            self.sampling.source_timeout_ms > 0,
            "sampling.source_timeout_ms must be > 0, got {}",
            self.sampling.source_timeout_ms
        );
        anyhow::ensure!(
            self.sampling.stats_log_interval_secs > 0,
            "sampling.stats_log_interval_secs must be > 0, got {}",
            self.sampling.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.health.warning_percent > 0.0
                && self.health.warning_percent < self.health.critical_percent
                && self.health.critical_percent <= 100.0,
            "health thresholds must satisfy 0 < warning_percent < critical_percent <= 100, got {} / {}",
            self.health.warning_percent,
            self.health.critical_percent
        );
        if let Some(table) = &self.identities {
            for (raw, canonical) in table {
                anyhow::ensure!(
                    !raw.is_empty() && !canonical.is_empty(),
                    "identities entries must be non-empty, got {:?} = {:?}",
                    raw,
                    canonical
                );
            }
        }
        Ok(())
    }
}
