//! Transform Program Model
//!
//! The structured, encoder-agnostic description of how a reel is produced:
//! per-input scale/crop/fade chains, a concatenation spec, an optional
//! background-audio input, an optional title overlay, and global output
//! constraints. Rendering to an FFmpeg filtergraph and argument vector lives
//! here; building a program from an ordered asset list lives in
//! [`ProgramBuilder`].
//!
//! Free text (the title) enters a rendering instruction exactly once, through
//! [`TitleOverlay`], and is escaped there. Building the graph from typed parts
//! keeps user-supplied strings out of filter syntax everywhere else.

mod builder;
mod title;

pub use builder::ProgramBuilder;
pub use title::TitleGenerator;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{ReelError, ReelResult, Resolution, TimeSec};

// =============================================================================
// Escaping
// =============================================================================

/// Escapes a value embedded in an FFmpeg filtergraph.
///
/// Filtergraphs treat `:` and `,` as separators and `\` as an escape
/// character; single quotes delimit literals.
fn escape_filter_value(raw: &str) -> String {
    raw.replace('\\', r"\\")
        .replace(':', r"\:")
        .replace(',', r"\,")
        .replace('\'', r"\'")
}

/// Escapes text handed to drawtext.
///
/// drawtext additionally expands `%{...}` expressions; user-provided text is
/// treated as literal.
fn escape_drawtext_value(raw: &str) -> String {
    escape_filter_value(raw).replace('%', r"\%")
}

/// Formats a time value the way the reference filtergraphs carry them.
fn fmt_sec(value: TimeSec) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// =============================================================================
// Per-Input Chain
// =============================================================================

/// Fade instruction within a clip chain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FadeSpec {
    /// Seconds into the clip where the fade begins
    pub start_sec: TimeSec,
    /// Fade duration in seconds
    pub duration_sec: TimeSec,
}

/// Transform chain for one input: scale-to-fill, center-crop, timestamp
/// reset, fade in, fade out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipChain {
    /// Index of the input this chain consumes
    pub input_index: usize,
    /// Canvas the clip is scaled and cropped to
    pub canvas: Resolution,
    pub fade_in: FadeSpec,
    pub fade_out: FadeSpec,
}

impl ClipChain {
    /// Label this chain's output stream carries in the graph.
    pub fn output_label(&self) -> String {
        format!("v{}", self.input_index)
    }

    /// Renders the chain as one filtergraph statement.
    fn to_filter(&self) -> String {
        let Resolution { width, height } = self.canvas;
        format!(
            "[{idx}:v]scale={width}:{height}:force_original_aspect_ratio=increase,\
             crop={width}:{height},setpts=PTS-STARTPTS,\
             fade=t=in:st={in_st}:d={in_d},fade=t=out:st={out_st}:d={out_d}[{label}]",
            idx = self.input_index,
            in_st = fmt_sec(self.fade_in.start_sec),
            in_d = fmt_sec(self.fade_in.duration_sec),
            out_st = fmt_sec(self.fade_out.start_sec),
            out_d = fmt_sec(self.fade_out.duration_sec),
            label = self.output_label(),
        )
    }
}

// =============================================================================
// Concatenation
// =============================================================================

/// Concatenation of the per-input chains, video-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatSpec {
    /// Chain output labels, in reel order
    pub input_labels: Vec<String>,
    /// Label the concatenated stream carries
    pub output_label: String,
}

impl ConcatSpec {
    pub fn input_count(&self) -> usize {
        self.input_labels.len()
    }

    fn to_filter(&self) -> String {
        let inputs: String = self
            .input_labels
            .iter()
            .map(|label| format!("[{label}]"))
            .collect();
        format!(
            "{inputs}concat=n={count}:v=1:a=0[{out}]",
            count = self.input_count(),
            out = self.output_label,
        )
    }
}

// =============================================================================
// Audio + Overlay
// =============================================================================

/// The single background-audio input mixed into the output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMixSpec {
    /// Location of the music file
    pub path: PathBuf,
    /// Index this input occupies in the invocation (after all video inputs)
    pub input_index: usize,
}

/// Title overlay drawn over the concatenated stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleOverlay {
    /// Display text; escaped at render time
    pub text: String,
    pub font_file: PathBuf,
    pub font_size: u32,
    /// Fixed vertical offset from the canvas top, in pixels
    pub y_offset: u32,
    /// Overlay visibility window, in seconds from reel start
    pub visible_from_sec: TimeSec,
    pub visible_until_sec: TimeSec,
}

impl TitleOverlay {
    fn to_filter(&self, input_label: &str, output_label: &str) -> String {
        format!(
            "[{input_label}]drawtext=text='{text}':fontfile={font}:fontsize={size}:\
             fontcolor=white:x=(w-text_w)/2:y={y}:enable='between(t,{from},{until})'[{output_label}]",
            text = escape_drawtext_value(&self.text),
            font = escape_filter_value(&self.font_file.to_string_lossy()),
            size = self.font_size,
            y = self.y_offset,
            from = fmt_sec(self.visible_from_sec),
            until = fmt_sec(self.visible_until_sec),
        )
    }
}

// =============================================================================
// Output Constraints
// =============================================================================

/// Global output constraints for the reel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub canvas: Resolution,
    /// Hard cap on output duration, seconds
    pub max_duration_sec: TimeSec,
    /// H.264-compatible video codec
    pub video_codec: String,
    /// AAC-compatible audio codec
    pub audio_codec: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            canvas: Resolution::vertical_1080p(),
            max_duration_sec: 60.0,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

// =============================================================================
// Transform Program
// =============================================================================

/// Complete description of one reel composition.
///
/// Invariant: the concat spec's input count equals the number of per-input
/// chains, which equals the number of video inputs. Overlay and audio are
/// optional; concatenation and scaling are mandatory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformProgram {
    /// Ordered video input locations
    pub inputs: Vec<PathBuf>,
    /// One chain per input, in input order
    pub chains: Vec<ClipChain>,
    pub concat: ConcatSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioMixSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<TitleOverlay>,
    pub output: OutputSettings,
}

impl TransformProgram {
    /// Checks the structural invariants.
    pub fn validate(&self) -> ReelResult<()> {
        if self.inputs.is_empty() {
            return Err(ReelError::InvalidProgram("no inputs".to_string()));
        }
        if self.chains.len() != self.inputs.len() {
            return Err(ReelError::InvalidProgram(format!(
                "{} chains for {} inputs",
                self.chains.len(),
                self.inputs.len()
            )));
        }
        if self.concat.input_count() != self.chains.len() {
            return Err(ReelError::InvalidProgram(format!(
                "concat expects {} inputs but {} chains are defined",
                self.concat.input_count(),
                self.chains.len()
            )));
        }
        if let Some(audio) = &self.audio {
            if audio.input_index != self.inputs.len() {
                return Err(ReelError::InvalidProgram(format!(
                    "audio input index {} must follow the {} video inputs",
                    audio.input_index,
                    self.inputs.len()
                )));
            }
        }
        Ok(())
    }

    /// Label of the stream mapped into the output.
    pub fn final_video_label(&self) -> &str {
        if self.overlay.is_some() {
            "finalv"
        } else {
            &self.concat.output_label
        }
    }

    /// Renders the complete filtergraph.
    pub fn filter_complex(&self) -> String {
        let mut statements: Vec<String> =
            self.chains.iter().map(ClipChain::to_filter).collect();
        statements.push(self.concat.to_filter());
        if let Some(overlay) = &self.overlay {
            statements.push(overlay.to_filter(&self.concat.output_label, "finalv"));
        }
        statements.join(";")
    }

    /// Renders the full encoder argument vector for the given destination.
    pub fn ffmpeg_args(&self, output_path: &Path) -> Vec<String> {
        let mut args = Vec::new();

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }
        if let Some(audio) = &self.audio {
            args.push("-i".to_string());
            args.push(audio.path.to_string_lossy().to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(self.filter_complex());

        args.push("-map".to_string());
        args.push(format!("[{}]", self.final_video_label()));
        if let Some(audio) = &self.audio {
            args.push("-map".to_string());
            args.push(format!("{}:a", audio.input_index));
        }

        args.push("-c:v".to_string());
        args.push(self.output.video_codec.clone());
        args.push("-c:a".to_string());
        args.push(self.output.audio_codec.clone());

        // -shortest ends the mix with the shorter of video/audio; the -t cap
        // bounds the reel regardless of total input length.
        args.push("-shortest".to_string());
        args.push("-t".to_string());
        args.push(fmt_sec(self.output.max_duration_sec));

        args.push("-y".to_string());
        args.push(output_path.to_string_lossy().to_string());

        args
    }
}
