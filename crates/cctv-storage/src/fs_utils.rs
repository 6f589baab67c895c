//! Filesystem helpers shared by the stores.

use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;

use cctv_models::CaptureTimestamp;

use crate::error::{StorageError, StorageResult};

/// Files in one directory whose names encode a capture timestamp.
#[derive(Debug, Default)]
pub struct TimestampedScan {
    /// Matching files, sorted oldest first
    pub entries: Vec<(CaptureTimestamp, PathBuf)>,
    /// Files with the right extension whose stem did not parse
    pub unparsable: Vec<PathBuf>,
}

/// List files with `extension` in `dir` and parse their stems.
///
/// A missing directory yields an empty scan. Subdirectories and files with
/// other extensions are ignored.
pub async fn scan_timestamped(dir: &Path, extension: &str) -> StorageResult<TimestampedScan> {
    let mut scan = TimestampedScan::default();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(scan),
        Err(e) => return Err(StorageError::list_failed(dir, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::list_failed(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if !entry.file_type().await.map(|t| t.is_file() || t.is_symlink()).unwrap_or(false) {
            continue;
        }
        match CaptureTimestamp::from_path(&path) {
            Ok(ts) => scan.entries.push((ts, path)),
            Err(_) => scan.unparsable.push(path),
        }
    }

    scan.entries.sort();
    Ok(scan)
}

/// Move a file from `src` to `dst`, replacing `dst` if it exists.
///
/// Tries a rename first. When staging and frame directories sit on different
/// filesystems the rename fails with EXDEV and the file is copied to a
/// temporary sibling of `dst`, renamed into place, and the source removed.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> StorageResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(StorageError::move_failed(format!(
            "{} -> {}: {}",
            src.display(),
            dst.display(),
            e
        ))),
    }
}

/// EXDEV is error code 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> StorageResult<()> {
    let tmp_dst = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &tmp_dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(StorageError::move_failed(format!(
            "copy {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        )));
    }

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(StorageError::move_failed(format!(
            "rename {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        )));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!("Failed to remove staged file {}: {}", src.display(), e);
    }

    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Counts from deleting a batch of files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalTally {
    pub deleted: usize,
    pub failed: usize,
}

/// Delete every path with `remove`, continuing past failures.
///
/// `remove` reports whether a file was actually deleted; a file that was
/// already gone counts as neither deleted nor failed.
pub async fn remove_each<'a, I, F, Fut>(paths: I, remove: F) -> RemovalTally
where
    I: IntoIterator<Item = &'a Path>,
    F: Fn(&'a Path) -> Fut,
    Fut: Future<Output = std::io::Result<bool>>,
{
    let mut tally = RemovalTally::default();
    for path in paths {
        match remove(path).await {
            Ok(true) => tally.deleted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
                tally.failed += 1;
            }
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("staging").join("front_door.jpg");
        let dst = dir.path().join("frames").join("front_door").join("20240101_120000.jpg");
        fs::create_dir_all(src.parent().unwrap()).await.unwrap();
        fs::write(&src, b"jpeg bytes").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_move_overwrites_same_second_frame() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.jpg");
        let dst = dir.path().join("20240101_120000.jpg");
        fs::write(&src, b"second").await.unwrap();
        fs::write(&dst, b"first").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = move_file(dir.path().join("nope.jpg"), dir.path().join("dst.jpg")).await;
        assert!(matches!(result, Err(StorageError::MoveFailed(_))));
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"x").await.unwrap();

        assert!(remove_if_exists(&path).await.unwrap());
        assert!(!remove_if_exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_each_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["a.jpg", "locked.jpg", "c.jpg", "gone.jpg"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        for path in &paths[..3] {
            fs::write(path, b"x").await.unwrap();
        }

        let tally = remove_each(paths.iter().map(PathBuf::as_path), |path| async move {
            if path.ends_with("locked.jpg") {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                ));
            }
            remove_if_exists(path).await
        })
        .await;

        assert_eq!(tally, RemovalTally { deleted: 2, failed: 1 });
        assert!(!paths[0].exists());
        assert!(paths[1].exists());
        assert!(!paths[2].exists());
    }

    #[tokio::test]
    async fn test_scan_timestamped_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in [
            "20240101_120500.jpg",
            "20240101_120000.jpg",
            "snapshot.jpg",
            "20240101_120100.png",
            "input_list_abc.txt",
        ] {
            fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        fs::create_dir(dir.path().join("20240101_130000.jpg")).await.unwrap();

        let scan = scan_timestamped(dir.path(), "jpg").await.unwrap();
        let names: Vec<_> = scan
            .entries
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["20240101_120000.jpg", "20240101_120500.jpg"]);
        assert_eq!(scan.unparsable, vec![dir.path().join("snapshot.jpg")]);
    }

    #[tokio::test]
    async fn test_scan_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let scan = scan_timestamped(&dir.path().join("absent"), "jpg").await.unwrap();
        assert!(scan.entries.is_empty());
        assert!(scan.unparsable.is_empty());
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
