//! Camera definitions and motion thresholds.

use serde::{Deserialize, Serialize};

/// Default per-pixel intensity delta above which a pixel counts as changed.
pub const DEFAULT_MOTION_THRESHOLD: u8 = 25;
/// Default connected-region size (pixels) above which a frame has motion.
pub const DEFAULT_MIN_MOTION_AREA: u32 = 500;

/// A camera as declared in the configuration document.
///
/// The identifier is the key of the `cameras` map; it is filled in after
/// deserialization by [`crate::SummarizerConfig::camera_list`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    /// Unique camera identifier
    #[serde(skip)]
    pub id: String,

    /// Stream address (typically `rtsp://...`)
    pub url: String,

    /// Enable motion gating for this camera
    #[serde(default)]
    pub track_changes: bool,

    /// Per-camera override of the pixel delta threshold
    #[serde(default)]
    pub motion_threshold: Option<u8>,

    /// Per-camera override of the minimum region area
    #[serde(default)]
    pub min_motion_area: Option<u32>,
}

impl CameraConfig {
    /// Create a camera with gating disabled and no overrides.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            track_changes: false,
            motion_threshold: None,
            min_motion_area: None,
        }
    }

    /// Enable motion gating.
    pub fn with_tracking(mut self) -> Self {
        self.track_changes = true;
        self
    }

    /// Resolve the effective thresholds against the global defaults.
    pub fn thresholds(&self, defaults: MotionThresholds) -> MotionThresholds {
        MotionThresholds {
            pixel_threshold: self.motion_threshold.unwrap_or(defaults.pixel_threshold),
            min_area: self.min_motion_area.unwrap_or(defaults.min_area),
        }
    }
}

/// Thresholds used by the motion gate for one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionThresholds {
    /// A pixel is changed iff its absolute delta is strictly greater than this
    pub pixel_threshold: u8,
    /// Motion iff some connected changed region is strictly larger than this
    pub min_area: u32,
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self {
            pixel_threshold: DEFAULT_MOTION_THRESHOLD,
            min_area: DEFAULT_MIN_MOTION_AREA,
        }
    }
}
