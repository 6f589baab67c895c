//! Summary video encoding from an ordered set of stills.
//!
//! Frames are handed to FFmpeg through a concat demuxer playlist. Each entry is
//! an absolute path and carries no explicit duration, so every frame is shown
//! for the same implicit time and the output rate is set by `-r`.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use cctv_models::VideoEncoding;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::slideshow_duration_ms;

/// Hard bound on one encode.
pub const ENCODE_TIMEOUT_SECS: u64 = 300;
/// Prefix of playlist files written next to the frames.
pub const PLAYLIST_PREFIX: &str = "input_list_";

/// Everything the encoder needs for one summary video.
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    /// Concat playlist listing the frames in display order
    pub playlist: &'a Path,
    /// Number of frames in the playlist
    pub frame_count: usize,
    /// Destination video file
    pub output: &'a Path,
    /// Rate, resolution and codec settings
    pub encoding: &'a VideoEncoding,
}

/// Merges an ordered list of stills into one video file.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(&self, job: EncodeJob<'_>) -> MediaResult<()>;
}

/// Encodes by running FFmpeg with the concat demuxer.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    timeout_secs: u64,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            timeout_secs: ENCODE_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The FFmpeg command used for one encode.
    pub fn command(job: &EncodeJob<'_>) -> FfmpegCommand {
        FfmpegCommand::new(job.playlist, job.output)
            .concat_playlist()
            .output_args(job.encoding.to_ffmpeg_args())
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, job: EncodeJob<'_>) -> MediaResult<()> {
        let cmd = Self::command(&job);
        let total_ms = slideshow_duration_ms(job.frame_count, job.encoding.fps);

        FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    frame = progress.frame,
                    percent = format!("{:.1}", progress.percentage(total_ms)),
                    "Encoding summary video"
                );
            })
            .await?;

        let size = tokio::fs::metadata(job.output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(MediaError::MissingOutput(job.output.to_path_buf()));
        }

        Ok(())
    }
}

/// Quote a path for the concat demuxer (`file '...'`).
pub fn playlist_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', "'\\''");
    format!("file '{}'", escaped)
}

/// Write a concat playlist for `frames` into `dir`.
///
/// The returned file is deleted when dropped, whatever happens to the encode.
pub fn write_playlist(dir: &Path, frames: &[PathBuf]) -> MediaResult<NamedTempFile> {
    if frames.is_empty() {
        return Err(MediaError::EmptyPlaylist);
    }

    let cwd = std::env::current_dir()?;
    let mut file = tempfile::Builder::new()
        .prefix(PLAYLIST_PREFIX)
        .suffix(".txt")
        .tempfile_in(dir)?;

    for frame in frames {
        let absolute = if frame.is_absolute() {
            frame.clone()
        } else {
            cwd.join(frame)
        };
        writeln!(file, "{}", playlist_entry(&absolute))?;
    }
    file.flush()?;

    Ok(file)
}
