//! Shared data models for the CCTV summarizer.
//!
//! This crate provides Serde-deserializable types for:
//! - The configuration document (global settings and cameras)
//! - Compact duration strings (`30s`, `1m`, `24h`)
//! - Filename-encoded capture timestamps
//! - Summary video encoding parameters

pub mod camera;
pub mod duration;
pub mod encoding;
pub mod settings;
pub mod timestamp;

// Re-export common types
pub use camera::{CameraConfig, MotionThresholds};
pub use duration::{parse_duration, DurationError};
pub use encoding::{parse_resolution, ResolutionError, VideoEncoding};
pub use settings::{SettingsError, SummarizerConfig, SummarizerSettings};
pub use timestamp::{CaptureTimestamp, TimestampError, FILENAME_FORMAT};
