//! Job Status Tracking
//!
//! In-memory registry of reel jobs and their lifecycle state. Every status a
//! caller can observe is a state the pipeline actually reached; terminal
//! states are sticky and cannot be overwritten by late transitions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::{new_job_id, JobId, ReelError, ReelResult};

// =============================================================================
// Status Model
// =============================================================================

/// Lifecycle state of a reel job.
///
/// Linear progression: Created, Ordering, Encoding, Uploading, then one of
/// the terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReelStatus {
    Created,
    Ordering,
    Encoding,
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl ReelStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Coarse progress estimate for pollers. Encoding dominates wall time.
    pub fn progress_percent(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Ordering => 10,
            Self::Encoding => 30,
            Self::Uploading => 85,
            Self::Completed => 100,
            Self::Failed | Self::Cancelled => 100,
        }
    }
}

/// Everything tracked about one job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub status: ReelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the job completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Set once the job fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Point-in-time view returned to status pollers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub job_id: JobId,
    pub status: ReelStatus,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JobRecord> for StatusSnapshot {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.clone(),
            status: record.status,
            progress_percent: record.status.progress_percent(),
            download_url: record.download_url.clone(),
            error: record.error.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Shared, clonable job registry.
#[derive(Clone, Default)]
pub struct JobStatusTracker {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new job and returns its identifier.
    pub async fn create(&self) -> JobId {
        let id = new_job_id();
        let now = Utc::now();
        let record = JobRecord {
            id: id.clone(),
            status: ReelStatus::Created,
            created_at: now,
            updated_at: now,
            download_url: None,
            error: None,
        };

        self.jobs.write().await.insert(id.clone(), record);
        debug!(job_id = %id, "job registered");
        id
    }

    /// Moves a job to a new non-terminal state.
    ///
    /// Transitions out of a terminal state are rejected so a late pipeline
    /// step cannot resurrect a finished job.
    pub async fn set_status(&self, id: &JobId, status: ReelStatus) -> ReelResult<()> {
        self.update(id, |record| {
            record.status = status;
        })
        .await
    }

    /// Marks a job completed with its download location.
    pub async fn complete(&self, id: &JobId, download_url: String) -> ReelResult<()> {
        self.update(id, |record| {
            record.status = ReelStatus::Completed;
            record.download_url = Some(download_url);
        })
        .await
    }

    /// Marks a job failed with a diagnostic.
    pub async fn fail(&self, id: &JobId, error: String) -> ReelResult<()> {
        self.update(id, |record| {
            record.status = ReelStatus::Failed;
            record.error = Some(error);
        })
        .await
    }

    /// Marks a job cancelled.
    pub async fn cancel(&self, id: &JobId) -> ReelResult<()> {
        self.update(id, |record| {
            record.status = ReelStatus::Cancelled;
        })
        .await
    }

    /// Returns the current view of a job.
    pub async fn snapshot(&self, id: &JobId) -> ReelResult<StatusSnapshot> {
        let jobs = self.jobs.read().await;
        let record = jobs
            .get(id)
            .ok_or_else(|| ReelError::JobNotFound(id.clone()))?;
        Ok(StatusSnapshot::from(record))
    }

    /// Snapshots of every tracked job, in no particular order.
    pub async fn list(&self) -> Vec<StatusSnapshot> {
        self.jobs
            .read()
            .await
            .values()
            .map(StatusSnapshot::from)
            .collect()
    }

    /// Removes a terminal job from the registry. Active jobs stay.
    pub async fn evict(&self, id: &JobId) -> ReelResult<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get(id) {
            Some(record) if record.status.is_terminal() => {
                jobs.remove(id);
                Ok(())
            }
            Some(_) => Err(ReelError::Validation(format!(
                "job {id} is still running"
            ))),
            None => Err(ReelError::JobNotFound(id.clone())),
        }
    }

    async fn update(
        &self,
        id: &JobId,
        apply: impl FnOnce(&mut JobRecord),
    ) -> ReelResult<()> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| ReelError::JobNotFound(id.clone()))?;

        if record.status.is_terminal() {
            return Err(ReelError::Validation(format!(
                "job {id} already finished as {:?}",
                record.status
            )));
        }

        apply(record);
        record.updated_at = Utc::now();
        debug!(job_id = %id, status = ?record.status, "job status updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_snapshot() {
        let tracker = JobStatusTracker::new();
        let id = tracker.create().await;

        let snap = tracker.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Created);
        assert_eq!(snap.progress_percent, 0);
        assert!(snap.download_url.is_none());
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_is_an_error() {
        let tracker = JobStatusTracker::new();
        let missing = "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string();
        assert!(matches!(
            tracker.snapshot(&missing).await,
            Err(ReelError::JobNotFound(_))
        ));
        assert!(tracker
            .set_status(&missing, ReelStatus::Encoding)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_status_progression_and_progress() {
        let tracker = JobStatusTracker::new();
        let id = tracker.create().await;

        for (status, percent) in [
            (ReelStatus::Ordering, 10),
            (ReelStatus::Encoding, 30),
            (ReelStatus::Uploading, 85),
        ] {
            tracker.set_status(&id, status).await.unwrap();
            let snap = tracker.snapshot(&id).await.unwrap();
            assert_eq!(snap.status, status);
            assert_eq!(snap.progress_percent, percent);
        }

        tracker.complete(&id, "http://store/reel.mp4".to_string()).await.unwrap();
        let snap = tracker.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Completed);
        assert_eq!(snap.progress_percent, 100);
        assert_eq!(snap.download_url.as_deref(), Some("http://store/reel.mp4"));
    }

    #[tokio::test]
    async fn test_failure_records_diagnostic() {
        let tracker = JobStatusTracker::new();
        let id = tracker.create().await;

        tracker.fail(&id, "encoder exited with exit code 1".to_string()).await.unwrap();
        let snap = tracker.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Failed);
        assert_eq!(
            snap.error.as_deref(),
            Some("encoder exited with exit code 1")
        );
    }

    #[tokio::test]
    async fn test_terminal_states_are_sticky() {
        let tracker = JobStatusTracker::new();
        let id = tracker.create().await;
        tracker.complete(&id, "url".to_string()).await.unwrap();

        assert!(tracker.set_status(&id, ReelStatus::Encoding).await.is_err());
        assert!(tracker.fail(&id, "late failure".to_string()).await.is_err());

        let snap = tracker.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Completed);
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn test_evict_only_terminal_jobs() {
        let tracker = JobStatusTracker::new();
        let id = tracker.create().await;

        assert!(tracker.evict(&id).await.is_err());

        tracker.cancel(&id).await.unwrap();
        tracker.evict(&id).await.unwrap();
        assert!(matches!(
            tracker.snapshot(&id).await,
            Err(ReelError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_tracker_clones_share_state() {
        let tracker = JobStatusTracker::new();
        let clone = tracker.clone();

        let id = tracker.create().await;
        clone.set_status(&id, ReelStatus::Encoding).await.unwrap();

        let snap = tracker.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, ReelStatus::Encoding);
    }
}
