//! Per-camera frame store with time-based eviction.
//!
//! Frames live as `<frames_root>/<camera>/<YYYYMMDD_HHMMSS>.jpg`. Appends,
//! evictions and listings for one camera are serialized by a per-camera lock
//! so a listing is always a consistent snapshot.
//!
//! An encode reads from a [`FrameSnapshot`]: hard links to the listed frames
//! in a scratch directory under `<frames_root>`, so evictions that run while
//! the encode is in flight do not pull files out from under it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use cctv_models::CaptureTimestamp;

use crate::error::StorageResult;
use crate::fs_utils::{move_file, remove_each, remove_if_exists, scan_timestamped};
use crate::layout::FRAME_EXTENSION;

/// Name prefix of snapshot scratch directories under the frames root.
pub const SNAPSHOT_PREFIX: &str = ".snapshot-";

/// A retained frame on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoredFrame {
    pub timestamp: CaptureTimestamp,
    pub path: PathBuf,
}

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub deleted: usize,
    pub failed: usize,
    /// Frame files whose names did not parse and were left alone
    pub skipped: usize,
}

/// Frames pinned for the duration of one encode.
///
/// Holds links to the frames, not the originals. The scratch directory and
/// everything in it is removed when the snapshot is dropped.
#[derive(Debug)]
pub struct FrameSnapshot {
    dir: TempDir,
    frames: Vec<StoredFrame>,
}

impl FrameSnapshot {
    /// Scratch directory holding the pinned frames.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Pinned frames, oldest first.
    pub fn frames(&self) -> &[StoredFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|f| f.path.clone()).collect()
    }
}

/// Frame store rooted at `<output>/frames`.
#[derive(Debug)]
pub struct FrameStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn camera_dir(&self, camera_id: &str) -> PathBuf {
        self.root.join(camera_id)
    }

    /// Path a frame captured at `timestamp` is stored under.
    pub fn frame_path(&self, camera_id: &str, timestamp: CaptureTimestamp) -> PathBuf {
        self.camera_dir(camera_id)
            .join(timestamp.file_name(FRAME_EXTENSION))
    }

    /// Create the camera's frame directory.
    pub async fn prepare(&self, camera_id: &str) -> StorageResult<()> {
        tokio::fs::create_dir_all(self.camera_dir(camera_id)).await?;
        Ok(())
    }

    fn camera_lock(&self, camera_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(camera_id.to_string()).or_default())
    }

    /// Move a staged capture into the store under its timestamp name.
    ///
    /// A frame already stored for the same second is replaced.
    pub async fn append(
        &self,
        camera_id: &str,
        timestamp: CaptureTimestamp,
        staged: &Path,
    ) -> StorageResult<StoredFrame> {
        let lock = self.camera_lock(camera_id);
        let _guard = lock.lock().await;

        let path = self.frame_path(camera_id, timestamp);
        move_file(staged, &path).await?;
        debug!(camera_id = %camera_id, "Stored frame {}", path.display());

        Ok(StoredFrame { timestamp, path })
    }

    /// Delete frames strictly older than `now - retention`.
    ///
    /// Files whose names do not parse are skipped. A file that cannot be
    /// deleted is logged and counted, and the pass continues.
    pub async fn evict_expired(
        &self,
        camera_id: &str,
        now: CaptureTimestamp,
        retention: Duration,
    ) -> StorageResult<EvictionReport> {
        let lock = self.camera_lock(camera_id);
        let _guard = lock.lock().await;

        let cutoff = now.saturating_sub(retention);
        let scan = scan_timestamped(&self.camera_dir(camera_id), FRAME_EXTENSION).await?;

        let mut report = EvictionReport {
            skipped: scan.unparsable.len(),
            ..Default::default()
        };
        for path in &scan.unparsable {
            debug!(camera_id = %camera_id, "Skipping unrecognized frame name {}", path.display());
        }

        // Entries are sorted, so the expired ones form a prefix
        let expired: Vec<&Path> = scan
            .entries
            .iter()
            .take_while(|(timestamp, _)| *timestamp < cutoff)
            .map(|(_, path)| path.as_path())
            .collect();
        let tally = remove_each(expired, remove_if_exists).await;
        report.deleted = tally.deleted;
        report.failed = tally.failed;
        if tally.failed > 0 {
            warn!(camera_id = %camera_id, failed = tally.failed, "Some expired frames were not evicted");
        }

        if report.deleted > 0 {
            info!(
                camera_id = %camera_id,
                deleted = report.deleted,
                "Evicted frames older than {}",
                cutoff
            );
        }
        Ok(report)
    }

    /// Snapshot of a camera's frames, oldest first.
    pub async fn list_ordered(&self, camera_id: &str) -> StorageResult<Vec<StoredFrame>> {
        let lock = self.camera_lock(camera_id);
        let _guard = lock.lock().await;

        let scan = scan_timestamped(&self.camera_dir(camera_id), FRAME_EXTENSION).await?;
        Ok(scan
            .entries
            .into_iter()
            .map(|(timestamp, path)| StoredFrame { timestamp, path })
            .collect())
    }

    /// Pin the camera's current frames for an encode.
    ///
    /// Each frame is hard linked into a fresh scratch directory, falling back
    /// to a copy when linking is not possible. A frame that disappears before
    /// it is linked is left out.
    pub async fn snapshot(&self, camera_id: &str) -> StorageResult<FrameSnapshot> {
        let lock = self.camera_lock(camera_id);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.root).await?;
        let dir = tempfile::Builder::new()
            .prefix(SNAPSHOT_PREFIX)
            .tempdir_in(&self.root)?;

        let scan = scan_timestamped(&self.camera_dir(camera_id), FRAME_EXTENSION).await?;
        let mut frames = Vec::with_capacity(scan.entries.len());
        for (timestamp, original) in scan.entries {
            let Some(name) = original.file_name() else {
                continue;
            };
            let pinned = dir.path().join(name);
            if let Err(e) = pin(&original, &pinned).await {
                warn!(camera_id = %camera_id, "Leaving {} out of snapshot: {}", original.display(), e);
                continue;
            }
            frames.push(StoredFrame {
                timestamp,
                path: pinned,
            });
        }

        debug!(camera_id = %camera_id, frames = frames.len(), "Pinned frames in {}", dir.path().display());
        Ok(FrameSnapshot { dir, frames })
    }
}

async fn pin(original: &Path, pinned: &Path) -> std::io::Result<()> {
    match tokio::fs::hard_link(original, pinned).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(e),
        Err(_) => tokio::fs::copy(original, pinned).await.map(|_| ()),
    }
}
