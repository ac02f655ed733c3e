//! Durable key-value slots backing the queue's persistent collections.
//!
//! A slot is a named string value. Collections serialize themselves to JSON
//! and write the whole document on every mutation; absent or unreadable
//! slots load as empty.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Failure reading or writing a durable slot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("slot I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("slot database: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("state directory unavailable: {0}")]
    StateDir(String),
}

/// Named durable slots. Implementations must be safe to share between tasks.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Current value of `key`, or `None` if it was never written.
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value of `key`.
    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Which backend to open for the default on-disk location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
}

/// Open the configured backend under the XDG state directory.
pub async fn open_default(backend: StoreBackend) -> Result<Arc<dyn SlotStore>, StoreError> {
    Ok(match backend {
        StoreBackend::File => Arc::new(FileStore::open_default()?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open_default().await?),
    })
}

pub(crate) fn state_dirs() -> Result<xdg::BaseDirectories, StoreError> {
    xdg::BaseDirectories::with_prefix("bgdl").map_err(|e| StoreError::StateDir(e.to_string()))
}
