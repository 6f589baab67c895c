//! Per-camera summary videos and same-day retention.
//!
//! Videos live as `<videos_root>/<camera>/<YYYYMMDD_HHMMSS>.<fmt>`. After each
//! successful assembly only the newest video of every calendar date is kept.
//! The optional `latest.<fmt>` alias and files whose names do not parse are
//! never touched by retention.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use cctv_models::CaptureTimestamp;

use crate::embed::EmbedTemplate;
use crate::error::{StorageError, StorageResult};
use crate::fs_utils::{remove_each, remove_if_exists, scan_timestamped};

/// File stem of the alias pointing at the newest video.
pub const LATEST_ALIAS_STEM: &str = "latest";

/// A summary video on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoredVideo {
    pub timestamp: CaptureTimestamp,
    pub path: PathBuf,
}

impl StoredVideo {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of one same-day sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Videos that same-day retention removes: every video that is not the
/// newest of its calendar date.
pub fn superseded_same_day(videos: &[StoredVideo]) -> Vec<StoredVideo> {
    let mut newest: HashMap<NaiveDate, CaptureTimestamp> = HashMap::new();
    for video in videos {
        let date = video.timestamp.date();
        newest
            .entry(date)
            .and_modify(|ts| *ts = (*ts).max(video.timestamp))
            .or_insert(video.timestamp);
    }

    let mut superseded: Vec<StoredVideo> = videos
        .iter()
        .filter(|v| newest.get(&v.timestamp.date()) != Some(&v.timestamp))
        .cloned()
        .collect();
    superseded.sort();
    superseded
}

/// Video store rooted at `<output>/videos`.
#[derive(Debug, Clone)]
pub struct VideoStore {
    root: PathBuf,
    extension: String,
}

impl VideoStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn camera_dir(&self, camera_id: &str) -> PathBuf {
        self.root.join(camera_id)
    }

    /// Create the camera's video directory.
    pub async fn prepare(&self, camera_id: &str) -> StorageResult<()> {
        tokio::fs::create_dir_all(self.camera_dir(camera_id)).await?;
        Ok(())
    }

    /// Path of the video assembled at `timestamp`.
    pub fn video_path(&self, camera_id: &str, timestamp: CaptureTimestamp) -> PathBuf {
        self.camera_dir(camera_id)
            .join(timestamp.file_name(&self.extension))
    }

    pub fn latest_alias_path(&self, camera_id: &str) -> PathBuf {
        self.camera_dir(camera_id)
            .join(format!("{}.{}", LATEST_ALIAS_STEM, self.extension))
    }

    pub fn embed_page_path(&self, camera_id: &str) -> PathBuf {
        self.root.join(format!("{}.html", camera_id))
    }

    /// A camera's videos, oldest first, excluding the alias and unparsable names.
    pub async fn list_videos(&self, camera_id: &str) -> StorageResult<Vec<StoredVideo>> {
        let scan = scan_timestamped(&self.camera_dir(camera_id), &self.extension).await?;
        for path in &scan.unparsable {
            let is_alias = path.file_stem().and_then(|s| s.to_str()) == Some(LATEST_ALIAS_STEM);
            if !is_alias {
                debug!(camera_id = %camera_id, "Ignoring unrecognized video name {}", path.display());
            }
        }

        Ok(scan
            .entries
            .into_iter()
            .map(|(timestamp, path)| StoredVideo { timestamp, path })
            .collect())
    }

    /// Keep only the newest video for each calendar date.
    pub async fn sweep_same_day(&self, camera_id: &str) -> StorageResult<SweepReport> {
        let videos = self.list_videos(camera_id).await?;
        let superseded = superseded_same_day(&videos);
        let superseded_paths: Vec<&Path> = superseded.iter().map(|v| v.path.as_path()).collect();
        let tally = remove_each(superseded_paths, remove_if_exists).await;
        let report = SweepReport {
            deleted: tally.deleted,
            failed: tally.failed,
        };
        if report.failed > 0 {
            warn!(camera_id = %camera_id, failed = report.failed, "Some superseded videos were not removed");
        }

        if report.deleted > 0 {
            info!(camera_id = %camera_id, deleted = report.deleted, "Same-day video sweep done");
        }
        Ok(report)
    }

    /// Point `latest.<fmt>` at `video` with a relative link.
    pub async fn refresh_latest_alias(&self, camera_id: &str, video: &StoredVideo) -> StorageResult<()> {
        let alias = self.latest_alias_path(camera_id);

        if tokio::fs::symlink_metadata(&alias).await.is_ok() {
            tokio::fs::remove_file(&alias)
                .await
                .map_err(|e| StorageError::alias_failed(format!("{}: {}", alias.display(), e)))?;
        }

        link_alias(&alias, &video.file_name(), &video.path)
            .await
            .map_err(|e| StorageError::alias_failed(format!("{}: {}", alias.display(), e)))?;
        debug!(camera_id = %camera_id, "Latest alias now points at {}", video.file_name());
        Ok(())
    }

    /// Write `<videos_root>/<camera>.html` for `video`.
    pub async fn write_embed_page(
        &self,
        camera_id: &str,
        video: &StoredVideo,
        template: &EmbedTemplate,
    ) -> StorageResult<PathBuf> {
        let relative = format!("{}/{}", camera_id, video.file_name());
        let page = self.embed_page_path(camera_id);
        tokio::fs::write(&page, template.render(&relative))
            .await
            .map_err(|e| StorageError::Template(format!("{}: {}", page.display(), e)))?;
        info!(camera_id = %camera_id, "Wrote embed page {}", page.display());
        Ok(page)
    }

    /// Best-effort removal of a partially written video.
    pub async fn discard_partial(&self, path: &Path) {
        if let Err(e) = remove_if_exists(path).await {
            warn!("Failed to remove partial video {}: {}", path.display(), e);
        }
    }
}

#[cfg(unix)]
async fn link_alias(alias: &Path, target_name: &str, _target: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target_name, alias).await
}

#[cfg(not(unix))]
async fn link_alias(alias: &Path, _target_name: &str, target: &Path) -> std::io::Result<()> {
    tokio::fs::copy(target, alias).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn video(stem: &str) -> StoredVideo {
        StoredVideo {
            timestamp: CaptureTimestamp::parse_stem(stem).unwrap(),
            path: PathBuf::from(format!("/v/cam/{}.mp4", stem)),
        }
    }

    async fn seed(store: &VideoStore, camera: &str, names: &[&str]) {
        let dir = store.camera_dir(camera);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for name in names {
            tokio::fs::write(dir.join(name), b"mp4").await.unwrap();
        }
    }

    fn names(videos: &[StoredVideo]) -> Vec<String> {
        videos.iter().map(|v| v.file_name()).collect()
    }

    #[test]
    fn test_superseded_keeps_newest_per_date() {
        let videos = vec![
            video("20240301_080000"),
            video("20240301_120000"),
            video("20240301_200000"),
            video("20240302_010000"),
        ];
        let superseded = superseded_same_day(&videos);
        assert_eq!(
            names(&superseded),
            vec!["20240301_080000.mp4", "20240301_120000.mp4"]
        );
    }

    #[test]
    fn test_superseded_empty_and_single() {
        assert!(superseded_same_day(&[]).is_empty());
        assert!(superseded_same_day(&[video("20240301_080000")]).is_empty());
    }

    #[tokio::test]
    async fn test_sweep_collapses_same_day() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path(), "mp4");
        seed(
            &store,
            "garage",
            &[
                "20240301_080000.mp4",
                "20240301_090000.mp4",
                "20240301_100000.mp4",
                "20240301_110000.mp4",
                "20240229_230000.mp4",
            ],
        )
        .await;

        let report = store.sweep_same_day("garage").await.unwrap();
        assert_eq!(report.deleted, 3);

        let remaining = store.list_videos("garage").await.unwrap();
        assert_eq!(
            names(&remaining),
            vec!["20240229_230000.mp4", "20240301_110000.mp4"]
        );
    }

    #[tokio::test]
    async fn test_sweep_leaves_alias_and_unknown_files() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path(), "mp4");
        seed(
            &store,
            "garage",
            &[
                "latest.mp4",
                "holiday.mp4",
                "20240301_080000.mp4",
                "20240301_090000.mp4",
                "20240301_070000.webm",
            ],
        )
        .await;

        store.sweep_same_day("garage").await.unwrap();

        let dir = store.camera_dir("garage");
        assert!(dir.join("latest.mp4").exists());
        assert!(dir.join("holiday.mp4").exists());
        assert!(dir.join("20240301_070000.webm").exists());
        assert!(!dir.join("20240301_080000.mp4").exists());
        assert!(dir.join("20240301_090000.mp4").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_latest_alias_is_relative_and_replaced() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path(), "mp4");
        seed(&store, "porch", &["20240301_080000.mp4", "20240301_090000.mp4"]).await;
        let videos = store.list_videos("porch").await.unwrap();

        store.refresh_latest_alias("porch", &videos[0]).await.unwrap();
        store.refresh_latest_alias("porch", &videos[1]).await.unwrap();

        let alias = store.latest_alias_path("porch");
        let target = std::fs::read_link(&alias).unwrap();
        assert_eq!(target, PathBuf::from("20240301_090000.mp4"));
        // The alias never shows up as a video
        assert_eq!(store.list_videos("porch").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_embed_page() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path(), "mp4");
        seed(&store, "porch", &["20240301_080000.mp4"]).await;
        let videos = store.list_videos("porch").await.unwrap();

        let page = store
            .write_embed_page("porch", &videos[0], &EmbedTemplate::new("<video src=\"{{video_path}}\">"))
            .await
            .unwrap();

        assert_eq!(page, dir.path().join("porch.html"));
        assert_eq!(
            std::fs::read_to_string(page).unwrap(),
            "<video src=\"porch/20240301_080000.mp4\">"
        );
    }

    #[tokio::test]
    async fn test_discard_partial() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path(), "mp4");
        let partial = dir.path().join("20240301_080000.mp4");
        std::fs::write(&partial, b"half").unwrap();

        store.discard_partial(&partial).await;
        store.discard_partial(&partial).await;
        assert!(!partial.exists());
    }
}
