//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while capturing, encoding or decoding frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("FFmpeg reported success but produced no output: {0}")]
    MissingOutput(PathBuf),

    #[error("Failed to decode image {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Playlist needs at least one frame")]
    EmptyPlaylist,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a decode failure error.
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is a transient external-process failure that the
    /// next scheduled attempt may not hit again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegFailed { .. } | MediaError::Timeout(_) | MediaError::MissingOutput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(MediaError::Timeout(10).is_transient());
        assert!(MediaError::ffmpeg_failed("exit 1", None, Some(1)).is_transient());
        assert!(MediaError::MissingOutput(PathBuf::from("/tmp/x.jpg")).is_transient());
        assert!(!MediaError::FfmpegNotFound.is_transient());
        assert!(!MediaError::EmptyPlaylist.is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = MediaError::decode("/frames/a.jpg", "bad header");
        assert_eq!(err.to_string(), "Failed to decode image /frames/a.jpg: bad header");
        assert_eq!(
            MediaError::Timeout(300).to_string(),
            "Operation timed out after 300 seconds"
        );
    }
}
