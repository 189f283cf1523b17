//! Per-Job Scratch Space
//!
//! Each job owns one directory under the scratch root holding its
//! materialized inputs and encoder output. Release removes the whole
//! directory; a `Drop` fallback covers paths that never reach an explicit
//! release, so scratch files do not outlive their job on success, failure,
//! or panic. Cleanup problems are logged, never surfaced: a reel that
//! encoded and uploaded is done, a stray temp directory is not worth
//! failing it over.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::core::{JobId, ReelResult};

/// Scratch directory owned by one job.
pub struct ScratchSpace {
    dir: PathBuf,
    released: AtomicBool,
}

impl ScratchSpace {
    /// Creates `scratch_root/{job_id}/`, including missing parents.
    pub async fn create(scratch_root: &Path, job_id: &JobId) -> ReelResult<Self> {
        let dir = scratch_root.join(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        debug!(job_id = %job_id, dir = %dir.display(), "scratch space created");
        Ok(Self {
            dir,
            released: AtomicBool::new(false),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location for the numbered input file `index` with the given extension.
    pub fn input_path(&self, index: usize, extension: &str) -> PathBuf {
        self.dir.join(format!("input-{index}.{extension}"))
    }

    /// Location the encoder writes the finished reel to.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join("reel.mp4")
    }

    /// Removes the directory and everything in it. Idempotent; the first
    /// call wins and later calls (including `Drop`) are no-ops.
    pub async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(dir = %self.dir.display(), "scratch space released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "scratch cleanup failed");
            }
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "scratch cleanup failed on drop");
            }
        }
    }
}
