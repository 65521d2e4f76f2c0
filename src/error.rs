// Error taxonomy for sampling, live queries and history writes.
//
// Omitted PIDs inside an otherwise successful source response are expected
// and are not represented here; they simply have no entry in the source map.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// A process or metric source could not be reached at all this pass.
    #[error("{source_name} source unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },

    /// The history store rejected or timed out a write for one application.
    #[error("history write for {app} failed: {reason}")]
    PersistenceFailure { app: String, reason: String },

    #[error("history read failed: {0}")]
    HistoryRead(String),
}

impl UsageError {
    pub fn unavailable(source_name: &'static str, reason: impl std::fmt::Display) -> Self {
        UsageError::SourceUnavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn persistence(app: &str, reason: impl std::fmt::Display) -> Self {
        UsageError::PersistenceFailure {
            app: app.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, UsageError::SourceUnavailable { .. })
    }
}
