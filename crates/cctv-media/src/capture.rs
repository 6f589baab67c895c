//! Single still-frame capture from a network stream.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Hard bound on one capture attempt.
pub const CAPTURE_TIMEOUT_SECS: u64 = 10;
/// JPEG quality scale passed to FFmpeg (2-5 is good).
pub const CAPTURE_JPEG_QUALITY: u8 = 2;

/// Pulls exactly one still image from a stream.
///
/// Failure and timeout are treated identically by callers: no frame this tick.
#[async_trait]
pub trait FrameCapturer: Send + Sync {
    /// Write one still frame from `stream_url` to `output`.
    async fn capture(&self, stream_url: &str, output: &Path) -> MediaResult<()>;
}

/// Captures frames by running FFmpeg against the stream.
#[derive(Debug, Clone)]
pub struct FfmpegCapturer {
    timeout_secs: u64,
}

impl Default for FfmpegCapturer {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCapturer {
    pub fn new() -> Self {
        Self {
            timeout_secs: CAPTURE_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The FFmpeg command used for one capture.
    pub fn command(stream_url: &str, output: &Path) -> FfmpegCommand {
        FfmpegCommand::from_source(stream_url, output)
            .rtsp_over_tcp()
            .single_frame()
            .quality(CAPTURE_JPEG_QUALITY)
    }
}

#[async_trait]
impl FrameCapturer for FfmpegCapturer {
    async fn capture(&self, stream_url: &str, output: &Path) -> MediaResult<()> {
        let cmd = Self::command(stream_url, output);
        FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run(&cmd)
            .await?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(MediaError::MissingOutput(output.to_path_buf()));
        }

        debug!(output = %output.display(), "Captured still frame");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_command() {
        let args = FfmpegCapturer::command("rtsp://cam/live", Path::new("/tmp/a.jpg")).build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-rtsp_transport tcp -i rtsp://cam/live"));
        assert!(joined.contains("-frames:v 1 -q:v 2 /tmp/a.jpg"));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(FfmpegCapturer::default().timeout_secs, CAPTURE_TIMEOUT_SECS);
        assert_eq!(FfmpegCapturer::new().with_timeout(3).timeout_secs, 3);
    }
}
