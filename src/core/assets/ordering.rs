//! Chronological Asset Ordering
//!
//! Produces a deterministic sequence from an unordered batch: capture
//! timestamps are resolved concurrently (extraction is read-only per asset),
//! then a stable sort orders by timestamp with original submission order
//! breaking ties. Assets with no resolvable timestamp sort as if captured at
//! the epoch, which places them at the front.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::debug;

use super::{MediaAsset, MetadataExtractor};

/// Orders assets for concatenation.
pub struct AssetOrderer;

impl AssetOrderer {
    /// Resolves capture timestamps and returns the assets in reel order.
    ///
    /// Pure over its inputs aside from the read-only metadata probe; assets
    /// already carrying a timestamp are not re-probed.
    pub async fn order(assets: Vec<MediaAsset>) -> Vec<MediaAsset> {
        let mut resolved = join_all(assets.into_iter().map(|mut asset| async {
            if asset.capture_time.is_none() {
                asset.capture_time = MetadataExtractor::extract_date(&asset).await;
            }
            asset
        }))
        .await;

        // Vec::sort_by_key is stable: equal keys keep submission order.
        resolved.sort_by_key(|asset| asset.capture_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));

        debug!(count = resolved.len(), "assets ordered by capture time");
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::MediaKind;
    use chrono::TimeZone;

    fn dated(path: &str, ts: Option<DateTime<Utc>>) -> MediaAsset {
        MediaAsset {
            path: path.into(),
            kind: MediaKind::Video,
            capture_time: ts,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_orders_by_capture_time() {
        let assets = vec![
            dated("/none/c.mp4", Some(at(3000))),
            dated("/none/a.mp4", Some(at(1000))),
            dated("/none/b.mp4", Some(at(2000))),
        ];

        let ordered = AssetOrderer::order(assets).await;
        let paths: Vec<_> = ordered.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            ["/none/a.mp4", "/none/b.mp4", "/none/c.mp4"]
                .map(std::path::PathBuf::from)
        );
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_submission_order() {
        let assets = vec![
            dated("/none/first.mp4", Some(at(500))),
            dated("/none/second.mp4", Some(at(500))),
            dated("/none/third.mp4", Some(at(500))),
        ];

        let ordered = AssetOrderer::order(assets).await;
        let paths: Vec<_> = ordered.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            ["/none/first.mp4", "/none/second.mp4", "/none/third.mp4"]
                .map(std::path::PathBuf::from)
        );
    }

    #[tokio::test]
    async fn test_undated_assets_sort_to_front() {
        // Nonexistent paths leave every timestamp source empty.
        let assets = vec![
            dated("/none/dated.mp4", Some(at(1_600_000_000))),
            dated("/none/undated.mp4", None),
        ];

        let ordered = AssetOrderer::order(assets).await;
        assert_eq!(ordered[0].path, std::path::PathBuf::from("/none/undated.mp4"));
        assert!(ordered[0].capture_time.is_none());
        assert_eq!(ordered[1].path, std::path::PathBuf::from("/none/dated.mp4"));
    }

    #[tokio::test]
    async fn test_multiple_undated_assets_are_stable() {
        let assets = vec![
            dated("/none/u1.mp4", None),
            dated("/none/u2.mp4", None),
            dated("/none/dated.mp4", Some(at(100))),
            dated("/none/u3.mp4", None),
        ];

        let ordered = AssetOrderer::order(assets).await;
        let paths: Vec<_> = ordered.iter().map(|a| a.path.clone()).collect();
        // Undated sort at epoch, ahead of everything dated, keeping order.
        assert_eq!(
            paths,
            ["/none/u1.mp4", "/none/u2.mp4", "/none/u3.mp4", "/none/dated.mp4"]
                .map(std::path::PathBuf::from)
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty() {
        let ordered = AssetOrderer::order(Vec::new()).await;
        assert!(ordered.is_empty());
    }

    #[tokio::test]
    async fn test_presupplied_timestamps_are_not_reprobed() {
        // A path that exists with a fresh mtime would sort last if re-probed;
        // the pre-supplied old timestamp must win.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.mp4");
        std::fs::File::create(&path).unwrap();

        let assets = vec![
            dated("/none/middle.mp4", Some(at(2_000))),
            MediaAsset {
                path: path.clone(),
                kind: MediaKind::Video,
                capture_time: Some(at(1_000)),
            },
        ];

        let ordered = AssetOrderer::order(assets).await;
        assert_eq!(ordered[0].path, path);
        assert_eq!(ordered[0].capture_time, Some(at(1_000)));
    }
}
