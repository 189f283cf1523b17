//! Reel Composition Pipeline
//!
//! End-to-end orchestration of one reel job: order the uploaded assets,
//! build the transform program, run the encoder, upload the result, and
//! clean up every intermediate file whether the job succeeded, failed, or
//! was cancelled. The encoder and store arrive by injection; the pipeline
//! itself owns ordering, status bookkeeping, and cleanup.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::assets::{AssetOrderer, MediaAsset, MetadataExtractor};
use super::encode::Encoder;
use super::jobs::{JobStatusTracker, ReelStatus, StatusSnapshot};
use super::program::{ProgramBuilder, TitleGenerator};
use super::scratch::ScratchSpace;
use super::storage::ReelStore;
use super::{JobId, PipelineConfig, ReelError, ReelResult};

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation handle for one job.
///
/// Checked between pipeline stages; a running encode finishes its current
/// stage before the cancellation is observed.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a finished reel job.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelHandle {
    pub job_id: JobId,
    pub download_url: String,
}

// =============================================================================
// Pipeline
// =============================================================================

pub struct ReelPipeline {
    config: PipelineConfig,
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn ReelStore>,
    tracker: JobStatusTracker,
}

impl ReelPipeline {
    pub fn new(
        config: PipelineConfig,
        encoder: Arc<dyn Encoder>,
        store: Arc<dyn ReelStore>,
    ) -> Self {
        Self {
            config,
            encoder,
            store,
            tracker: JobStatusTracker::new(),
        }
    }

    pub fn tracker(&self) -> &JobStatusTracker {
        &self.tracker
    }

    /// Composes a reel from an unordered asset batch and uploads it.
    ///
    /// `location` is the caller-supplied free-text trip location; it drives
    /// the title overlay when present.
    pub async fn create_reel(
        &self,
        assets: Vec<MediaAsset>,
        location: Option<String>,
    ) -> ReelResult<ReelHandle> {
        self.create_reel_with_cancel(assets, location, CancelFlag::new())
            .await
    }

    /// [`create_reel`](Self::create_reel) with an externally held
    /// cancellation handle.
    pub async fn create_reel_with_cancel(
        &self,
        assets: Vec<MediaAsset>,
        location: Option<String>,
        cancel: CancelFlag,
    ) -> ReelResult<ReelHandle> {
        // Rejected before a job or scratch space exists; there is nothing to
        // track or clean up yet.
        if assets.is_empty() {
            return Err(ReelError::Validation(
                "a reel needs at least one asset".to_string(),
            ));
        }

        let job_id = self.tracker.create().await;
        let input_paths: Vec<PathBuf> = assets.iter().map(|a| a.path.clone()).collect();
        let scratch = match ScratchSpace::create(&self.config.scratch_root, &job_id).await {
            Ok(scratch) => scratch,
            Err(e) => {
                // The job exists, so it gets the same failure record and
                // input cleanup as any later stage.
                self.remove_inputs(&input_paths).await;
                self.tracker.fail(&job_id, e.diagnostic()).await?;
                warn!(job_id = %job_id, error = %e, "scratch allocation failed");
                return Err(e);
            }
        };

        info!(job_id = %job_id, assets = assets.len(), "reel job started");

        let result = self
            .run_stages(&job_id, assets, location, &scratch, &cancel)
            .await;

        // Inputs and scratch go regardless of how the stages ended.
        self.remove_inputs(&input_paths).await;
        scratch.release().await;

        match result {
            Ok(download_url) => {
                self.tracker.complete(&job_id, download_url.clone()).await?;
                info!(job_id = %job_id, url = %download_url, "reel job completed");
                Ok(ReelHandle {
                    job_id,
                    download_url,
                })
            }
            Err(ReelError::Cancelled(_)) => {
                self.tracker.cancel(&job_id).await?;
                info!(job_id = %job_id, "reel job cancelled");
                Err(ReelError::Cancelled(job_id))
            }
            Err(e) => {
                self.tracker.fail(&job_id, e.diagnostic()).await?;
                warn!(job_id = %job_id, error = %e, "reel job failed");
                Err(e)
            }
        }
    }

    /// Current view of a job for status pollers.
    pub async fn get_status(&self, job_id: &JobId) -> ReelResult<StatusSnapshot> {
        self.tracker.snapshot(job_id).await
    }

    async fn remove_inputs(&self, input_paths: &[PathBuf]) {
        for path in input_paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "input cleanup failed");
                }
            }
        }
    }

    async fn run_stages(
        &self,
        job_id: &JobId,
        assets: Vec<MediaAsset>,
        location: Option<String>,
        scratch: &ScratchSpace,
        cancel: &CancelFlag,
    ) -> ReelResult<String> {
        self.check_cancelled(job_id, cancel)?;
        self.tracker.set_status(job_id, ReelStatus::Ordering).await?;

        let ordered = AssetOrderer::order(assets).await;

        // The caller's location names the trip; without one, fall back to
        // the coordinates of the first clip's shot.
        let location = match location {
            Some(l) if !l.trim().is_empty() => Some(l),
            _ => match ordered.first() {
                Some(first) => MetadataExtractor::extract_location(first).await,
                None => None,
            },
        };
        let title = TitleGenerator::generate(location.as_deref(), Utc::now());

        let music = match &self.config.music_path {
            Some(path) if tokio::fs::try_exists(path).await.unwrap_or(false) => {
                Some(path.clone())
            }
            Some(path) => {
                // A missing bundled track yields a silent reel, not a failure.
                warn!(path = %path.display(), "background music file missing, composing without audio");
                None
            }
            None => None,
        };

        let program =
            ProgramBuilder::new(self.config.clone()).build(&ordered, &title, music)?;

        self.check_cancelled(job_id, cancel)?;
        self.tracker.set_status(job_id, ReelStatus::Encoding).await?;

        let output = scratch.output_path();
        self.encoder.encode(&program, &output).await?;

        self.check_cancelled(job_id, cancel)?;
        self.tracker.set_status(job_id, ReelStatus::Uploading).await?;

        let key = format!("reels/{job_id}.mp4");
        let url = self.store.upload(&output, &key).await?;
        Ok(url)
    }

    fn check_cancelled(&self, job_id: &JobId, cancel: &CancelFlag) -> ReelResult<()> {
        if cancel.is_cancelled() {
            return Err(ReelError::Cancelled(job_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::MediaKind;
    use crate::core::encode::EncodeError;
    use crate::core::program::TransformProgram;
    use crate::core::storage::StorageError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records the program it was given and writes a placeholder output.
    struct MockEncoder {
        fail: bool,
        captured: Mutex<Option<TransformProgram>>,
    }

    impl MockEncoder {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                captured: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                captured: Mutex::new(None),
            })
        }

        fn program(&self) -> TransformProgram {
            self.captured.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl Encoder for MockEncoder {
        async fn encode(
            &self,
            program: &TransformProgram,
            output_path: &Path,
        ) -> Result<(), EncodeError> {
            *self.captured.lock().unwrap() = Some(program.clone());
            if self.fail {
                return Err(EncodeError::Failed {
                    status: "exit code 1".to_string(),
                    detail: "Invalid data found".to_string(),
                });
            }
            tokio::fs::write(output_path, b"encoded reel").await?;
            Ok(())
        }
    }

    struct MockStore {
        fail: bool,
        uploads: Mutex<Vec<String>>,
    }

    impl MockStore {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                uploads: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                uploads: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReelStore for MockStore {
        async fn upload(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
            if self.fail {
                return Err(StorageError::Upload {
                    key: key.to_string(),
                    source: std::io::Error::other("bucket unavailable"),
                });
            }
            assert!(local_path.exists(), "upload source must exist");
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(format!("http://store/{key}"))
        }

        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct Fixture {
        pipeline: ReelPipeline,
        encoder: Arc<MockEncoder>,
        store: Arc<MockStore>,
        _scratch_root: tempfile::TempDir,
        upload_dir: tempfile::TempDir,
    }

    fn fixture_with(encoder: Arc<MockEncoder>, store: Arc<MockStore>) -> Fixture {
        let scratch_root = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            scratch_root: scratch_root.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        Fixture {
            pipeline: ReelPipeline::new(config, encoder.clone(), store.clone()),
            encoder,
            store,
            _scratch_root: scratch_root,
            upload_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockEncoder::ok(), MockStore::ok())
    }

    impl Fixture {
        /// Materializes n fake uploads and returns their assets.
        async fn uploads(&self, n: usize) -> Vec<MediaAsset> {
            let batch = crate::core::new_job_id();
            let mut assets = Vec::new();
            for i in 0..n {
                let path = self
                    .upload_dir
                    .path()
                    .join(format!("upload-{batch}-{i}.mp4"));
                tokio::fs::write(&path, b"clip").await.unwrap();
                assets.push(MediaAsset::new(path, MediaKind::Video));
            }
            assets
        }
    }

    #[tokio::test]
    async fn test_successful_reel_end_to_end() {
        let fx = fixture();
        let assets = fx.uploads(3).await;
        let paths: Vec<_> = assets.iter().map(|a| a.path.clone()).collect();

        let handle = fx.pipeline.create_reel(assets, None).await.unwrap();

        assert_eq!(
            handle.download_url,
            format!("http://store/reels/{}.mp4", handle.job_id)
        );
        let snap = fx.pipeline.get_status(&handle.job_id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Completed);
        assert_eq!(snap.download_url.as_deref(), Some(handle.download_url.as_str()));

        // Inputs and scratch are gone.
        for path in paths {
            assert!(!path.exists(), "input should be removed: {}", path.display());
        }
        assert!(!fx.pipeline.config.scratch_root.join(&handle.job_id).exists());
        assert_eq!(fx.store.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected_without_a_job() {
        let fx = fixture();
        let err = fx.pipeline.create_reel(Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));
        assert!(fx.encoder.captured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_encoder_failure_marks_job_failed_and_cleans_up() {
        let fx = fixture_with(MockEncoder::failing(), MockStore::ok());
        let assets = fx.uploads(2).await;
        let paths: Vec<_> = assets.iter().map(|a| a.path.clone()).collect();

        let err = fx.pipeline.create_reel(assets, None).await.unwrap_err();
        assert!(matches!(err, ReelError::Encode(_)));

        for path in paths {
            assert!(!path.exists(), "inputs removed on failure too");
        }
        let mut entries = tokio::fs::read_dir(&fx.pipeline.config.scratch_root)
            .await
            .unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        assert!(fx.store.uploads.lock().unwrap().is_empty());

        let jobs = fx.pipeline.tracker().list().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, ReelStatus::Failed);
        let diagnostic = jobs[0].error.as_deref().unwrap();
        assert!(diagnostic.contains("exit code 1"), "got {diagnostic}");
    }

    #[tokio::test]
    async fn test_upload_failure_marks_job_failed() {
        let fx = fixture_with(MockEncoder::ok(), MockStore::failing());
        let assets = fx.uploads(1).await;

        let err = fx.pipeline.create_reel(assets, None).await.unwrap_err();
        assert!(matches!(err, ReelError::Upload(_)));

        // Scratch space is released even though encode succeeded.
        let mut entries = tokio::fs::read_dir(&fx.pipeline.config.scratch_root)
            .await
            .unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fx = fixture();
        let assets = fx.uploads(2).await;
        let paths: Vec<_> = assets.iter().map(|a| a.path.clone()).collect();

        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = fx
            .pipeline
            .create_reel_with_cancel(assets, None, cancel)
            .await
            .unwrap_err();
        let ReelError::Cancelled(job_id) = err else {
            panic!("expected cancellation, got {err:?}");
        };

        let snap = fx.pipeline.get_status(&job_id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Cancelled);
        assert!(fx.encoder.captured.lock().unwrap().is_none());
        for path in paths {
            assert!(!path.exists(), "inputs removed on cancellation");
        }
    }

    #[tokio::test]
    async fn test_assets_are_reordered_chronologically() {
        let fx = fixture();
        let mut assets = fx.uploads(3).await;
        // Newest first on submission; capture times force a reversal.
        assets[0].capture_time = Some(Utc.timestamp_opt(3_000, 0).unwrap());
        assets[1].capture_time = Some(Utc.timestamp_opt(2_000, 0).unwrap());
        assets[2].capture_time = Some(Utc.timestamp_opt(1_000, 0).unwrap());
        let expected: Vec<_> = assets.iter().rev().map(|a| a.path.clone()).collect();

        fx.pipeline.create_reel(assets, None).await.unwrap();

        let program = fx.encoder.program();
        assert_eq!(program.inputs, expected);
    }

    #[tokio::test]
    async fn test_program_carries_title_and_no_audio_without_music() {
        let fx = fixture();
        let assets = fx.uploads(1).await;

        fx.pipeline.create_reel(assets, None).await.unwrap();

        let program = fx.encoder.program();
        let overlay = program.overlay.as_ref().unwrap();
        let year = Utc::now().format("%Y").to_string();
        assert_eq!(overlay.text, format!("Travel Memories {year}"));
        assert!(program.audio.is_none());
    }

    #[tokio::test]
    async fn test_missing_music_file_yields_silent_reel() {
        let scratch_root = tempfile::tempdir().unwrap();
        let encoder = MockEncoder::ok();
        let config = PipelineConfig {
            scratch_root: scratch_root.path().to_path_buf(),
            music_path: Some(PathBuf::from("/nonexistent/music.mp3")),
            ..PipelineConfig::default()
        };
        let pipeline = ReelPipeline::new(config, encoder.clone(), MockStore::ok());

        let upload_dir = tempfile::tempdir().unwrap();
        let path = upload_dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"clip").await.unwrap();

        pipeline
            .create_reel(vec![MediaAsset::new(path, MediaKind::Video)], None)
            .await
            .unwrap();
        assert!(encoder.program().audio.is_none());
    }

    #[tokio::test]
    async fn test_present_music_file_is_mixed_in() {
        let scratch_root = tempfile::tempdir().unwrap();
        let music_dir = tempfile::tempdir().unwrap();
        let music = music_dir.path().join("default-music.mp3");
        tokio::fs::write(&music, b"mp3").await.unwrap();

        let encoder = MockEncoder::ok();
        let config = PipelineConfig {
            scratch_root: scratch_root.path().to_path_buf(),
            music_path: Some(music.clone()),
            ..PipelineConfig::default()
        };
        let pipeline = ReelPipeline::new(config, encoder.clone(), MockStore::ok());

        let upload_dir = tempfile::tempdir().unwrap();
        let mut assets = Vec::new();
        for i in 0..2 {
            let path = upload_dir.path().join(format!("clip{i}.mp4"));
            tokio::fs::write(&path, b"clip").await.unwrap();
            assets.push(MediaAsset::new(path, MediaKind::Video));
        }

        pipeline.create_reel(assets, None).await.unwrap();

        let program = encoder.program();
        let audio = program.audio.as_ref().unwrap();
        assert_eq!(audio.path, music);
        assert_eq!(audio.input_index, 2);
    }

    #[tokio::test]
    async fn test_supplied_location_names_the_title() {
        let fx = fixture();
        let assets = fx.uploads(1).await;

        fx.pipeline
            .create_reel(assets, Some("Paris".to_string()))
            .await
            .unwrap();

        let year = Utc::now().format("%Y").to_string();
        let overlay = fx.encoder.program().overlay.unwrap();
        assert_eq!(overlay.text, format!("Trip to Paris {year}"));
    }

    #[tokio::test]
    async fn test_blank_location_falls_back_to_generic_title() {
        let fx = fixture();
        let assets = fx.uploads(1).await;

        fx.pipeline
            .create_reel(assets, Some("   ".to_string()))
            .await
            .unwrap();

        let year = Utc::now().format("%Y").to_string();
        let overlay = fx.encoder.program().overlay.unwrap();
        assert_eq!(overlay.text, format!("Travel Memories {year}"));
    }

    #[tokio::test]
    async fn test_scratch_failure_marks_job_failed_and_removes_inputs() {
        // A regular file where the scratch root should be makes directory
        // creation fail before any stage runs.
        let blocked = tempfile::tempdir().unwrap();
        let root_file = blocked.path().join("scratch");
        tokio::fs::write(&root_file, b"not a directory").await.unwrap();

        let encoder = MockEncoder::ok();
        let config = PipelineConfig {
            scratch_root: root_file,
            ..PipelineConfig::default()
        };
        let pipeline = ReelPipeline::new(config, encoder.clone(), MockStore::ok());

        let upload_dir = tempfile::tempdir().unwrap();
        let input = upload_dir.path().join("clip.mp4");
        tokio::fs::write(&input, b"clip").await.unwrap();

        let err = pipeline
            .create_reel(vec![MediaAsset::new(&input, MediaKind::Video)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReelError::Io(_)), "got {err:?}");

        assert!(!input.exists(), "inputs removed when scratch allocation fails");
        assert!(encoder.captured.lock().unwrap().is_none());

        let jobs = pipeline.tracker().list().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, ReelStatus::Failed);
        assert!(jobs[0].error.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_jobs_track_independently() {
        let fx = Arc::new(fixture());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let fx = fx.clone();
            let assets = fx.uploads(1).await;
            handles.push(tokio::spawn(async move {
                fx.pipeline.create_reel(assets, None).await
            }));
        }

        let mut job_ids = Vec::new();
        for handle in handles {
            let reel = handle.await.unwrap().unwrap();
            job_ids.push(reel.job_id);
        }

        job_ids.sort();
        job_ids.dedup();
        assert_eq!(job_ids.len(), 4, "each job gets its own identifier");
        for id in &job_ids {
            let snap = fx.pipeline.get_status(id).await.unwrap();
            assert_eq!(snap.status, ReelStatus::Completed);
        }
    }
}
