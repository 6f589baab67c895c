//! FFmpeg CLI wrapper and motion gating for camera frames.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with hard timeouts
//! - Progress parsing from `-progress pipe:2`
//! - Single-frame capture from network streams
//! - Concat-playlist encoding of stills into a summary video
//! - Per-camera motion gating against the last kept frame

pub mod capture;
pub mod command;
pub mod encode;
pub mod error;
pub mod motion;
pub mod progress;

pub use capture::{FfmpegCapturer, FrameCapturer, CAPTURE_TIMEOUT_SECS};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use encode::{write_playlist, EncodeJob, FfmpegEncoder, VideoEncoder, ENCODE_TIMEOUT_SECS};
pub use error::{MediaError, MediaResult};
pub use motion::{decode_grayscale, GateDecision, GateVerdict, MotionAnalysis, MotionGate};
pub use progress::FfmpegProgress;
