use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds callers may want to tell apart.
///
/// Most functions return `anyhow::Result`; these surface through
/// `err.downcast_ref::<StoreError>()`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable at {}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database schema version {found} is newer than supported version {supported}")]
    VersionConflict { found: i64, supported: i64 },

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("collection '{collection}' has no index '{index}'")]
    UnknownIndex {
        collection: &'static str,
        index: &'static str,
    },

    #[error("record for '{collection}' has no string 'id' field")]
    MissingKey { collection: &'static str },

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn invalid_backup(msg: impl Into<String>) -> Self {
        Self::InvalidBackup(msg.into())
    }
}
