//! FFmpeg Encoder
//!
//! Runs transform programs through an external `ffmpeg` binary. Concurrency
//! is bounded by a semaphore sized from configuration; submissions past the
//! bound queue rather than fail. Processes are spawned with `kill_on_drop` so
//! a cancelled or panicked caller never leaks an encoder.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

use crate::core::program::TransformProgram;
use crate::core::PipelineConfig;

use super::{EncodeError, Encoder};

/// Lines of stderr kept for the error report when an encode fails.
const STDERR_TAIL_LINES: usize = 40;

/// External FFmpeg process encoder
pub struct FfmpegEncoder {
    binary: PathBuf,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl FfmpegEncoder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            binary: config.ffmpeg_path.clone(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_encodes.max(1))),
            timeout: config.encode_timeout_sec.map(Duration::from_secs),
        }
    }

    /// Checks that the configured binary runs at all.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn run(&self, args: &[String]) -> Result<(), EncodeError> {
        let mut child = tokio::process::Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::BinaryNotFound(self.binary.display().to_string())
                } else {
                    EncodeError::Spawn(e)
                }
            })?;

        // Drain stderr concurrently; an undrained pipe stalls the encoder
        // once the buffer fills.
        let stderr = child.stderr.take();
        let drain = tokio::spawn(async move {
            let mut tail: Vec<String> = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!(target: "ffmpeg", "{line}");
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail
        });

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(timeout_sec = limit.as_secs(), "encode timed out, killing process");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    drain.abort();
                    return Err(EncodeError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        let tail = drain.await.unwrap_or_default();

        if !status.success() {
            return Err(EncodeError::Failed {
                status: status
                    .code()
                    .map(|c| format!("exit code {c}"))
                    .unwrap_or_else(|| "signal".to_string()),
                detail: tail.join("\n"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        program: &TransformProgram,
        output_path: &Path,
    ) -> Result<(), EncodeError> {
        program
            .validate()
            .map_err(|e| EncodeError::InvalidProgram(e.to_string()))?;

        let args = program.ffmpeg_args(output_path);
        debug!(
            inputs = program.inputs.len(),
            output = %output_path.display(),
            "waiting for encode slot"
        );

        // Closed only on drop of the encoder itself, which cannot happen
        // while `self` is borrowed here.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EncodeError::Spawn(std::io::Error::other(e)))?;

        info!(
            inputs = program.inputs.len(),
            with_audio = program.audio.is_some(),
            output = %output_path.display(),
            "starting encode"
        );

        let result = self.run(&args).await;

        match &result {
            Ok(()) => info!(output = %output_path.display(), "encode finished"),
            Err(e) => warn!(output = %output_path.display(), error = %e, "encode failed"),
        }
        result
    }
}
