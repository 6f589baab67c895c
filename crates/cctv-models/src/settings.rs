//! The configuration document.
//!
//! ```yaml
//! config:
//!   output_path: ./output
//!   summary_duration: 24h
//!   capture_interval: 1m
//!   video_generation_interval: 1h
//! cameras:
//!   front_door:
//!     url: rtsp://10.0.0.2/live
//!     track_changes: true
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::camera::{CameraConfig, MotionThresholds, DEFAULT_MIN_MOTION_AREA, DEFAULT_MOTION_THRESHOLD};
use crate::duration;
use crate::encoding::{parse_resolution, ResolutionError, VideoEncoding, DEFAULT_FORMAT, DEFAULT_FPS};

/// Errors found while checking a loaded configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid resolution: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("No cameras configured")]
    NoCameras,

    #[error("Invalid camera id '{0}': must be a plain directory name")]
    InvalidCameraId(String),

    #[error("Invalid stream url for camera '{camera}': {source}")]
    InvalidUrl {
        camera: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid video format '{0}'")]
    InvalidFormat(String),
}

/// Global settings, the `config:` section of the document.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SummarizerSettings {
    /// Root directory for frames, videos and staging files
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// How long captured frames are retained
    #[serde(default = "default_summary_duration", deserialize_with = "duration::deserialize")]
    #[validate(custom(function = "non_zero_duration"))]
    pub summary_duration: Duration,

    /// Period of the global capture tick
    #[serde(default = "default_capture_interval", deserialize_with = "duration::deserialize")]
    #[validate(custom(function = "non_zero_duration"))]
    pub capture_interval: Duration,

    /// Period of each camera's assembly task
    #[serde(
        default = "default_video_generation_interval",
        deserialize_with = "duration::deserialize"
    )]
    #[validate(custom(function = "non_zero_duration"))]
    pub video_generation_interval: Duration,

    /// Summary video frame rate
    #[serde(default = "default_video_fps")]
    #[validate(range(min = 1, max = 240))]
    pub video_fps: u32,

    /// Summary video vertical resolution, e.g. `720p`
    #[serde(default = "default_resolution")]
    pub resolution: String,

    /// Summary video container (file extension)
    #[serde(default = "default_video_format")]
    pub video_format: String,

    /// Default pixel delta threshold
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: u8,

    /// Default minimum motion region area
    #[serde(default = "default_min_motion_area")]
    pub min_motion_area: u32,

    /// Log verbosity (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maintain a `latest.<format>` symlink per camera
    #[serde(default)]
    pub create_latest_link: bool,

    /// HTML template rendered after each successful assembly
    #[serde(default)]
    pub iframe_template: Option<PathBuf>,

    /// Address for the Prometheus exporter, disabled when absent
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./output")
}
fn default_summary_duration() -> Duration {
    Duration::from_secs(24 * 3_600)
}
fn default_capture_interval() -> Duration {
    Duration::from_secs(60)
}
fn default_video_generation_interval() -> Duration {
    Duration::from_secs(3_600)
}
fn default_video_fps() -> u32 {
    DEFAULT_FPS
}
fn default_resolution() -> String {
    "720p".to_string()
}
fn default_video_format() -> String {
    DEFAULT_FORMAT.to_string()
}
fn default_motion_threshold() -> u8 {
    DEFAULT_MOTION_THRESHOLD
}
fn default_min_motion_area() -> u32 {
    DEFAULT_MIN_MOTION_AREA
}
fn default_log_level() -> String {
    "INFO".to_string()
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            summary_duration: default_summary_duration(),
            capture_interval: default_capture_interval(),
            video_generation_interval: default_video_generation_interval(),
            video_fps: default_video_fps(),
            resolution: default_resolution(),
            video_format: default_video_format(),
            motion_threshold: default_motion_threshold(),
            min_motion_area: default_min_motion_area(),
            log_level: default_log_level(),
            create_latest_link: false,
            iframe_template: None,
            metrics_listen: None,
        }
    }
}

impl SummarizerSettings {
    /// Default motion thresholds for cameras without overrides.
    pub fn default_thresholds(&self) -> MotionThresholds {
        MotionThresholds {
            pixel_threshold: self.motion_threshold,
            min_area: self.min_motion_area,
        }
    }

    /// Encoding derived from `video_fps`, `resolution` and `video_format`.
    pub fn encoding(&self) -> Result<VideoEncoding, ResolutionError> {
        let height = parse_resolution(&self.resolution)?;
        Ok(VideoEncoding::new(self.video_fps, height, self.video_format.clone()))
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummarizerConfig {
    /// Global settings
    #[serde(default)]
    pub config: SummarizerSettings,

    /// Cameras keyed by identifier
    #[serde(default)]
    pub cameras: BTreeMap<String, CameraConfig>,
}

impl SummarizerConfig {
    /// Cameras with their identifiers filled in, ordered by identifier.
    pub fn camera_list(&self) -> Vec<CameraConfig> {
        self.cameras
            .iter()
            .map(|(id, camera)| CameraConfig {
                id: id.clone(),
                ..camera.clone()
            })
            .collect()
    }

    /// Look up one camera by identifier.
    pub fn camera(&self, id: &str) -> Option<CameraConfig> {
        self.cameras.get(id).map(|camera| CameraConfig {
            id: id.to_string(),
            ..camera.clone()
        })
    }

    /// Comma separated camera identifiers, for diagnostics.
    pub fn camera_ids(&self) -> String {
        self.cameras.keys().cloned().collect::<Vec<_>>().join(", ")
    }

    /// Check everything that cannot be expressed through serde alone.
    pub fn check(&self) -> Result<(), SettingsError> {
        self.config.validate()?;
        self.config.encoding()?;

        let format = &self.config.video_format;
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SettingsError::InvalidFormat(format.clone()));
        }

        if self.cameras.is_empty() {
            return Err(SettingsError::NoCameras);
        }

        for (id, camera) in &self.cameras {
            if !is_plain_name(id) {
                return Err(SettingsError::InvalidCameraId(id.clone()));
            }
            url::Url::parse(&camera.url).map_err(|source| SettingsError::InvalidUrl {
                camera: id.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

fn is_plain_name(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.starts_with('.')
}
