//! Asset Model Definitions
//!
//! Defines the MediaAsset struct describing one input file contributed to a
//! reel, plus kind inference from MIME type and file extension.

mod metadata;
mod ordering;

pub use metadata::MetadataExtractor;
pub use ordering::AssetOrderer;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asset kind enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Infers the kind from a MIME type (the upload collaborator supplies one
    /// per file).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    /// Infers the kind from a file extension, used when no MIME type is
    /// available.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "tiff" | "bmp" => Some(Self::Image),
            "mp4" | "mov" | "avi" | "mkv" | "webm" => Some(Self::Video),
            _ => None,
        }
    }
}

/// One input file contributed to a reel.
///
/// The path is a scratch-storage handle owned by the job that created the
/// asset; the file is removed when the job finishes or fails. Immutable once
/// the capture timestamp has been resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    /// Scratch-storage location of the materialized upload
    pub path: PathBuf,
    /// Image or video
    pub kind: MediaKind,
    /// Best-effort capture timestamp; None when extraction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_time: Option<DateTime<Utc>>,
}

impl MediaAsset {
    /// Creates an asset with an unresolved capture timestamp.
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
            capture_time: None,
        }
    }

    /// Creates an asset, inferring the kind from the MIME type with an
    /// extension fallback. Defaults to Video when neither is recognized, so
    /// unknown containers still pass through to the encoder.
    pub fn from_upload(path: impl Into<PathBuf>, mime: &str) -> Self {
        let path = path.into();
        let kind = MediaKind::from_mime(mime)
            .or_else(|| MediaKind::from_path(&path))
            .unwrap_or(MediaKind::Video);
        Self {
            path,
            kind,
            capture_time: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }
}
