//! Reel Storage Abstraction
//!
//! Finished reels leave scratch through a [`ReelStore`]. The pipeline
//! depends on the trait and receives its store by injection, so tests swap
//! in fakes and deployments pick their backend at wiring time.
//! [`LocalReelStore`] is the bundled filesystem-backed implementation.

mod local;

pub use local::LocalReelStore;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::ReelError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by store implementations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage configuration: {0}")]
    Config(String),

    #[error("upload of {key} failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("delete of {key} failed: {source}")]
    Delete {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<StorageError> for ReelError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => ReelError::StorageConfig(msg),
            other => ReelError::Upload(other.to_string()),
        }
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Durable destination for finished reels.
///
/// `upload` copies a local file under `key` and returns the URL the reel is
/// reachable at. Keys are forward-slash separated regardless of platform.
#[async_trait]
pub trait ReelStore: Send + Sync {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Content type a stored object is served with, from its extension.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
