use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the cache entities.
///
/// Remote "not found" style answers are not errors; they become placeholder
/// records. Link failures are logged and never reach callers.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Insufficient identifying arguments: {0}")]
    Construction(String),

    #[error("Unsupported remote state: {0}")]
    Unsupported(String),

    #[error("No anime matches {0}")]
    UnknownAnime(String),

    #[error("Failed to probe {}: {source}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Refresh task failed: {0}")]
    Task(String),
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}
