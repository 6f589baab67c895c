//! Summary video encoding configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default output pixel format, playable in browsers
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Default output frame rate
pub const DEFAULT_FPS: u32 = 25;
/// Default vertical resolution
pub const DEFAULT_HEIGHT: u32 = 720;
/// Default container extension
pub const DEFAULT_FORMAT: &str = "mp4";

/// Invalid resolution string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid resolution '{0}', expected e.g. 720p or 1080")]
pub struct ResolutionError(pub String);

/// Parse a vertical resolution such as `720p` or `1080`.
pub fn parse_resolution(value: &str) -> Result<u32, ResolutionError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_suffix('p')
        .or_else(|| trimmed.strip_suffix('P'))
        .unwrap_or(trimmed);

    match digits.parse::<u32>() {
        Ok(height) if height > 0 => Ok(height),
        _ => Err(ResolutionError(value.to_string())),
    }
}

/// How retained frames are merged into a summary video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEncoding {
    /// Output frame rate
    pub fps: u32,
    /// Output height in pixels; width follows the aspect ratio
    pub height: u32,
    /// Container format, also the file extension (e.g. "mp4")
    pub format: String,
    /// Video codec
    pub codec: String,
    /// Encoding preset
    pub preset: String,
    /// Constant Rate Factor (0-51, lower is better)
    pub crf: u8,
    /// Output pixel format
    pub pixel_format: String,
}

impl Default for VideoEncoding {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            height: DEFAULT_HEIGHT,
            format: DEFAULT_FORMAT.to_string(),
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
        }
    }
}

impl VideoEncoding {
    /// Create an encoding with the given rate, height and container.
    pub fn new(fps: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            fps,
            height,
            format: format.into(),
            ..Default::default()
        }
    }

    /// Scale filter keeping the aspect ratio with an even width.
    pub fn scale_filter(&self) -> String {
        format!("scale=-2:{}", self.height)
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-vf".to_string(),
            self.scale_filter(),
            "-r".to_string(),
            self.fps.to_string(),
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ]
    }
}
