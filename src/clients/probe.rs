//! Filesystem primitives the file entity relies on.

use std::path::Path;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: i64,
    pub mtime: DateTime<Utc>,
}

impl FileStat {
    /// Same stat with the modification time cut to whole seconds, which is
    /// the precision persisted in the cache.
    #[must_use]
    pub fn truncated(self) -> Self {
        Self {
            size: self.size,
            mtime: DateTime::from_timestamp(self.mtime.timestamp(), 0).unwrap_or(self.mtime),
        }
    }
}

#[async_trait::async_trait]
pub trait FileProbe: Send + Sync {
    async fn stat(&self, path: &Path) -> std::io::Result<FileStat>;

    /// Content hash as understood by the remote service.
    async fn hash(&self, path: &Path) -> std::io::Result<String>;
}
