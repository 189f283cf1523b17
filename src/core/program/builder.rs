//! Transform Program Builder
//!
//! Turns an ordered asset list plus pipeline configuration into a validated
//! [`TransformProgram`]. The builder performs no I/O; whether a music file
//! actually exists is the caller's concern, and passing `None` simply yields
//! a silent reel.

use std::path::PathBuf;

use crate::core::assets::MediaAsset;
use crate::core::{PipelineConfig, ReelError, ReelResult};

use super::{
    AudioMixSpec, ClipChain, ConcatSpec, FadeSpec, OutputSettings, TitleOverlay, TransformProgram,
};

/// Builds transform programs from ordered assets.
pub struct ProgramBuilder {
    config: PipelineConfig,
}

impl ProgramBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Assembles a program for the given assets, already in reel order.
    ///
    /// Every asset gets the same scale/crop/fade chain; the title overlay is
    /// always present; background audio is included only when a music path is
    /// supplied.
    pub fn build(
        &self,
        ordered_assets: &[MediaAsset],
        title: &str,
        music: Option<PathBuf>,
    ) -> ReelResult<TransformProgram> {
        if ordered_assets.is_empty() {
            return Err(ReelError::InvalidProgram(
                "cannot compose a reel from zero assets".to_string(),
            ));
        }

        let inputs: Vec<PathBuf> = ordered_assets.iter().map(|a| a.path.clone()).collect();

        let chains: Vec<ClipChain> = (0..inputs.len())
            .map(|input_index| ClipChain {
                input_index,
                canvas: self.config.canvas,
                fade_in: FadeSpec {
                    start_sec: 0.0,
                    duration_sec: self.config.fade_duration_sec,
                },
                fade_out: FadeSpec {
                    start_sec: self.config.fade_out_start_sec,
                    duration_sec: self.config.fade_duration_sec,
                },
            })
            .collect();

        let concat = ConcatSpec {
            input_labels: chains.iter().map(ClipChain::output_label).collect(),
            output_label: "outv".to_string(),
        };

        let audio = music.map(|path| AudioMixSpec {
            path,
            input_index: inputs.len(),
        });

        let overlay = Some(TitleOverlay {
            text: title.to_string(),
            font_file: self.config.title.font_file.clone(),
            font_size: self.config.title.font_size,
            y_offset: self.config.title.y_offset,
            visible_from_sec: self.config.title.visible_from_sec,
            visible_until_sec: self.config.title.visible_until_sec,
        });

        let program = TransformProgram {
            inputs,
            chains,
            concat,
            audio,
            overlay,
            output: OutputSettings {
                canvas: self.config.canvas,
                max_duration_sec: self.config.max_duration_sec,
                ..OutputSettings::default()
            },
        };

        program.validate()?;
        Ok(program)
    }
}
