//! CCTV summarizer worker.
//!
//! This crate provides:
//! - Configuration loading with environment overrides
//! - The capture cycle: capture, motion gate, store, evict
//! - Summary video assembly with same-day retention
//! - The capture loop and per-camera assembly timers
//! - Motion gate inspection over stored frames

pub mod assembler;
pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod metrics;
pub mod scheduler;

pub use assembler::{assemble, assemble_all, MIN_FRAMES};
pub use capture::{capture_once, evict_expired, CaptureOutcome};
pub use config::{WorkerConfig, DEFAULT_CONFIG_PATH};
pub use context::SummarizerContext;
pub use error::{WorkerError, WorkerResult};
pub use inspect::{inspect_camera, FrameInspection, InspectionReport};
pub use logging::{init_tracing, CameraLogger};
pub use scheduler::{Scheduler, TickSummary, LOOP_BACKOFF};
