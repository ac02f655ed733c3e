//! One JSON file per slot, replaced atomically via a `.part` sibling + rename.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{state_dirs, SlotStore, StoreError};
use crate::url_model::sanitize_file_name;

/// Slots stored as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under `~/.local/state/bgdl/slots`.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = state_dirs()?
            .create_state_directory("slots")
            .map_err(|source| StoreError::Io {
                path: "slots".to_string(),
                source,
            })?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_file_name(key)))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl SlotStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_err(&self.dir))?;
        let path = self.slot_path(key);
        let mut part = path.clone().into_os_string();
        part.push(".part");
        let part = PathBuf::from(part);
        tokio::fs::write(&part, value).await.map_err(io_err(&part))?;
        tokio::fs::rename(&part, &path).await.map_err(io_err(&path))?;
        Ok(())
    }
}
