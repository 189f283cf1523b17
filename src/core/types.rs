//! ReelForge Core Type Definitions
//!
//! Defines fundamental types used throughout the crate.

use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Reel job unique identifier (ULID)
pub type JobId = String;

/// Generates a fresh job identifier.
pub fn new_job_id() -> JobId {
    ulid::Ulid::new().to_string()
}

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

// =============================================================================
// Spatial Types
// =============================================================================

/// Output canvas size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Vertical 9:16 canvas used for reels.
    pub fn vertical_1080p() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::vertical_1080p()
    }
}
