//! Media storage - where source images and derivatives live
//!
//! The orchestrator reads sources and writes derivatives through the
//! `MediaStorage` trait; the filesystem implementation below covers
//! single-node deployments and tests, with public URLs built from a
//! configured base.

use crate::config::MediaConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Read a stored object. A missing object is `SourceMissing`; any other
    /// I/O failure is a storage fault.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Write an object, creating parent directories as needed.
    async fn write(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Public URL clients are redirected to for a stored object.
    fn public_url(&self, path: &str) -> String;
}

/// Filesystem-backed storage rooted at `MEDIA_ROOT`.
pub struct FsMediaStorage {
    root: PathBuf,
    base_url: String,
}

impl FsMediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl MediaStorage for FsMediaStorage {
    async fn read(&self, path: &str) -> Result<Bytes> {
        match tokio::fs::read(self.absolute(path)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::SourceMissing(
                "Cannot find image file.".to_string(),
            )),
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to read '{path}': {e}"
            ))),
        }
    }

    async fn write(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let target = self.absolute(path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(format!("Failed to create '{path}': {e}")))?;
        }

        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to write '{path}': {e}")))?;

        debug!(path, content_type, size = data.len(), "Stored derivative");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
