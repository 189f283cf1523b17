//! Encoding Abstraction
//!
//! The [`Encoder`] trait is the seam between reel composition and the
//! external encoder process. The pipeline depends on the trait, so tests run
//! against in-memory fakes while production wires in [`FfmpegEncoder`].

mod ffmpeg;

pub use ffmpeg::FfmpegEncoder;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::program::TransformProgram;
use crate::core::ReelError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by encoder implementations
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("encoder binary not found: {0}")]
    BinaryNotFound(String),

    #[error("failed to spawn encoder: {0}")]
    Spawn(std::io::Error),

    #[error("encoder exited with {status}: {detail}")]
    Failed { status: String, detail: String },

    #[error("encode exceeded the {0}s timeout")]
    Timeout(u64),

    #[error("invalid program: {0}")]
    InvalidProgram(String),

    #[error("encoder i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EncodeError> for ReelError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::InvalidProgram(msg) => ReelError::InvalidProgram(msg),
            other => ReelError::Encode(other.to_string()),
        }
    }
}

// =============================================================================
// Encoder Trait
// =============================================================================

/// Runs one transform program to completion, producing `output_path`.
///
/// Implementations bound their own concurrency; callers may submit without
/// throttling. A returned `Ok` means the output file exists and is complete.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(
        &self,
        program: &TransformProgram,
        output_path: &Path,
    ) -> Result<(), EncodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_maps_into_reel_error() {
        let err: ReelError = EncodeError::Timeout(300).into();
        assert!(matches!(err, ReelError::Encode(_)));
        assert!(err.to_string().contains("300"));

        let err: ReelError = EncodeError::InvalidProgram("bad graph".to_string()).into();
        assert!(matches!(err, ReelError::InvalidProgram(_)));
    }
}
