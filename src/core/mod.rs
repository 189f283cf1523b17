//! ReelForge Core Engine
//!
//! Core composition pipeline module.
//! Handles asset ordering, transform-program construction, encode
//! orchestration, job lifecycle tracking, and scratch-space management.

pub mod assets;
pub mod config;
pub mod encode;
pub mod jobs;
pub mod pipeline;
pub mod program;
pub mod scratch;
pub mod storage;

// Re-export common types
pub use config::{PipelineConfig, TitleConfig};

mod types;
pub use types::*;

mod error;
pub use error::*;
