//! Filesystem-Backed Reel Store
//!
//! Stores reels under a local directory and addresses them through a
//! configured base URL, typically one a static file server exposes. The
//! constructor creates the root eagerly so a misconfigured store fails at
//! wiring time instead of after a finished encode.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{content_type_for_path, ReelStore, StorageError};

pub struct LocalReelStore {
    root: PathBuf,
    base_url: String,
}

impl LocalReelStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self, StorageError> {
        let root = root.into();
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(StorageError::Config("empty base url".to_string()));
        }
        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::Config(format!("cannot create {}: {e}", root.display())))?;
        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        // Keys use forward slashes; map them onto the local separator.
        key.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }
}

#[async_trait]
impl ReelStore for LocalReelStore {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        let dest = self.object_path(key);
        let io_err = |source| StorageError::Upload {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let bytes = tokio::fs::copy(local_path, &dest).await.map_err(io_err)?;

        let url = format!("{}/{key}", self.base_url);
        info!(
            key = %key,
            bytes,
            content_type = content_type_for_path(&dest),
            "reel stored"
        );
        Ok(url)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let dest = self.object_path(key);
        match tokio::fs::remove_file(&dest).await {
            Ok(()) => {
                debug!(key = %key, "stored reel deleted");
                Ok(())
            }
            // Deleting an absent object is a no-op, matching bucket semantics.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}
