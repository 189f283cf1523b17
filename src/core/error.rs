//! ReelForge Error Definitions
//!
//! Defines error types used throughout the pipeline.

use thiserror::Error;

use super::JobId;

/// Core pipeline error types
#[derive(Error, Debug)]
pub enum ReelError {
    // =========================================================================
    // Request Validation
    // =========================================================================
    #[error("Invalid request: {0}")]
    Validation(String),

    // =========================================================================
    // Job Lifecycle
    // =========================================================================
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job cancelled: {0}")]
    Cancelled(JobId),

    // =========================================================================
    // Transform Program
    // =========================================================================
    #[error("Invalid transform program: {0}")]
    InvalidProgram(String),

    // =========================================================================
    // Encoding
    // =========================================================================
    #[error("Encode failed: {0}")]
    Encode(String),

    // =========================================================================
    // Storage
    // =========================================================================
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Storage configuration error: {0}")]
    StorageConfig(String),

    // =========================================================================
    // Filesystem
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReelError {
    /// Short diagnostic message safe to expose through status queries.
    ///
    /// Callers never see stack traces or internal paths beyond what the
    /// variant message itself carries.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

pub type ReelResult<T> = Result<T, ReelError>;
