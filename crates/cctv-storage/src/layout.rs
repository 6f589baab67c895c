//! Output directory layout.
//!
//! ```text
//! <output>/frames/<camera>/<YYYYMMDD_HHMMSS>.jpg
//! <output>/videos/<camera>/<YYYYMMDD_HHMMSS>.<fmt>
//! <output>/videos/<camera>.html
//! <output>/staging/<camera>-<random>.jpg
//! ```
//!
//! Per-camera paths belong to [`crate::FrameStore`] and [`crate::VideoStore`];
//! this type only knows the roots.

use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

use crate::error::StorageResult;

/// Extension of stored frame files.
pub const FRAME_EXTENSION: &str = "jpg";

/// Paths under the configured output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_root(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn videos_root(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn staging_root(&self) -> PathBuf {
        self.root.join("staging")
    }

    /// Reserve a unique file for a fresh capture to land in before the motion
    /// gate decides on it.
    ///
    /// The file is removed when the returned path is dropped, unless it has
    /// been moved away first. Concurrent captures of the same camera, even
    /// from separate processes, never share a staging file.
    pub fn staging_frame(&self, camera_id: &str) -> std::io::Result<TempPath> {
        tempfile::Builder::new()
            .prefix(&format!("{}-", camera_id))
            .suffix(&format!(".{}", FRAME_EXTENSION))
            .tempfile_in(self.staging_root())
            .map(NamedTempFile::into_temp_path)
    }

    /// Create the output, staging, frames and videos roots.
    pub async fn prepare(&self) -> StorageResult<()> {
        for dir in [self.staging_root(), self.frames_root(), self.videos_root()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        debug!("Prepared output directories under {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roots() {
        let layout = OutputLayout::new("/var/cctv");
        assert_eq!(layout.frames_root(), PathBuf::from("/var/cctv/frames"));
        assert_eq!(layout.videos_root(), PathBuf::from("/var/cctv/videos"));
        assert_eq!(layout.staging_root(), PathBuf::from("/var/cctv/staging"));
    }

    #[tokio::test]
    async fn test_prepare_creates_directories() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path().join("out"));

        layout.prepare().await.unwrap();
        // Idempotent
        layout.prepare().await.unwrap();

        assert!(layout.staging_root().is_dir());
        assert!(layout.frames_root().is_dir());
        assert!(layout.videos_root().is_dir());
    }

    #[tokio::test]
    async fn test_staging_frames_are_unique() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        layout.prepare().await.unwrap();

        let first = layout.staging_frame("front_door").unwrap();
        let second = layout.staging_frame("front_door").unwrap();

        assert_ne!(first.to_path_buf(), second.to_path_buf());
        for staged in [&first, &second] {
            let name = staged.file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with("front_door-"));
            assert!(name.ends_with(".jpg"));
            assert_eq!(staged.parent(), Some(layout.staging_root().as_path()));
        }

        let kept = first.to_path_buf();
        drop(first);
        assert!(!kept.exists());
        assert!(second.exists());
    }
}
