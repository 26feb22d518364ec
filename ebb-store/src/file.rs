//! File-backed state store with atomic replace-on-write.
//!
//! Saves write the full record as pretty JSON to a sibling `.tmp` path, then
//! rename it over the canonical path. The temporary file lives in the same
//! directory so the rename stays within one filesystem and the replace is
//! atomic; a crash mid-save leaves either the old file or the new one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ebb_domain::PositionState;

use crate::error::StoreError;
use crate::repository::StateStore;

/// State store persisting to a single JSON file.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store for the given canonical path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Canonical path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os: OsString = self.path.as_os_str().to_owned();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<PositionState>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    async fn save(&self, state: &PositionState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Encode(e.to_string()))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
