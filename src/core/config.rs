//! Pipeline Configuration
//!
//! Composition constants and process-level knobs for the reel pipeline.
//! Defaults reproduce the reference composition (vertical 1080x1920 canvas,
//! half-second fades, 60 second cap); deployments override via serde.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Resolution;

/// Title overlay configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleConfig {
    /// Font file handed to drawtext
    pub font_file: PathBuf,
    /// Font size in points
    pub font_size: u32,
    /// Fixed vertical offset from the top of the canvas, in pixels
    pub y_offset: u32,
    /// Overlay becomes visible at this many seconds into the reel
    pub visible_from_sec: f64,
    /// Overlay is hidden again after this many seconds
    pub visible_until_sec: f64,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            font_file: PathBuf::from("/System/Library/Fonts/Arial.ttf"),
            font_size: 60,
            y_offset: 100,
            visible_from_sec: 1.0,
            visible_until_sec: 4.0,
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Root directory for per-job scratch namespaces
    pub scratch_root: PathBuf,
    /// Output canvas
    pub canvas: Resolution,
    /// Hard cap on output duration in seconds
    pub max_duration_sec: f64,
    /// Fade-in/fade-out duration per clip in seconds
    pub fade_duration_sec: f64,
    /// Fixed offset into each clip where the fade-out begins.
    ///
    /// This is a fixed per-clip window, not derived from actual clip length;
    /// clips shorter than the window fade out early. Inherited behavior.
    pub fade_out_start_sec: f64,
    /// Title overlay settings
    pub title: TitleConfig,
    /// Optional bundled background-music file; absence is non-fatal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_path: Option<PathBuf>,
    /// Upper bound on concurrently running encode processes
    pub max_concurrent_encodes: usize,
    /// Wall-clock timeout per encode invocation, in seconds (None = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode_timeout_sec: Option<u64>,
    /// FFmpeg binary to invoke (name resolved via PATH, or an absolute path)
    pub ffmpeg_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from("scratch"),
            canvas: Resolution::vertical_1080p(),
            max_duration_sec: 60.0,
            fade_duration_sec: 0.5,
            fade_out_start_sec: 2.5,
            title: TitleConfig::default(),
            music_path: None,
            // Encoding is CPU- and memory-heavy; leave headroom for the rest
            // of the process.
            max_concurrent_encodes: (num_cpus::get() / 2).max(1),
            encode_timeout_sec: None,
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}
