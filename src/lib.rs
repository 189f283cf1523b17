//! ReelForge Core Library
//!
//! Composes an unordered batch of user-supplied photos and videos into a
//! single short vertical video ("reel"): assets are ordered by capture time,
//! scaled onto a common canvas, concatenated with fades, overlaid with a
//! generated title, mixed with optional background music, capped to a maximum
//! duration, and published through a storage collaborator.
//!
//! The HTTP surface (routing, multipart handling, auth) lives outside this
//! crate; callers hand the pipeline already-materialized scratch files.

pub mod core;

// Re-export the public surface at the crate root.
pub use crate::core::assets::{AssetOrderer, MediaAsset, MediaKind, MetadataExtractor};
pub use crate::core::encode::{EncodeError, Encoder, FfmpegEncoder};
pub use crate::core::jobs::{JobStatusTracker, ReelStatus, StatusSnapshot};
pub use crate::core::pipeline::{CancelFlag, ReelHandle, ReelPipeline};
pub use crate::core::program::{ProgramBuilder, TitleGenerator, TransformProgram};
pub use crate::core::scratch::ScratchSpace;
pub use crate::core::storage::{LocalReelStore, ReelStore, StorageError};
pub use crate::core::{
    new_job_id, JobId, PipelineConfig, ReelError, ReelResult, Resolution, TitleConfig,
};

use std::path::Path;
use std::sync::OnceLock;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes tracing for the process.
///
/// Logs to stdout; when `log_dir` is given, also to a daily-rolling file in
/// that directory. Safe to call more than once (later calls are no-ops), so
/// tests and embedding applications can both use it.
pub fn init_logging(log_dir: Option<&Path>) {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    let file_layer = log_dir.map(|dir| {
        let _ = std::fs::create_dir_all(dir);
        let file_appender = tracing_appender::rolling::daily(dir, "reelforge.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    // Avoid panics if already initialized (tests, repeated embedding).
    let _ = tracing::subscriber::set_global_default(subscriber);
}
