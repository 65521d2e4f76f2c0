// Health banding over already-normalized percentages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// `[health]` section. Bands: below `warning_percent` is healthy,
/// from `critical_percent` up is critical.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HealthThresholds {
    #[serde(default = "default_warning_percent")]
    pub warning_percent: f64,
    #[serde(default = "default_critical_percent")]
    pub critical_percent: f64,
}

fn default_warning_percent() -> f64 {
    70.0
}

fn default_critical_percent() -> f64 {
    90.0
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            warning_percent: default_warning_percent(),
            critical_percent: default_critical_percent(),
        }
    }
}

impl HealthThresholds {
    pub fn classify(&self, usage_percent: f64) -> HealthStatus {
        if usage_percent >= self.critical_percent {
            HealthStatus::Critical
        } else if usage_percent >= self.warning_percent {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}
