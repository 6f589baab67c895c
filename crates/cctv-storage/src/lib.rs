//! Local filesystem storage for captured frames and summary videos.
//!
//! This crate provides:
//! - The output directory layout
//! - A frame store with time-based eviction and encode snapshots
//! - A video store with same-day retention and a `latest` alias
//! - HTML embed pages for the newest video

pub mod embed;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod layout;
pub mod videos;

pub use embed::EmbedTemplate;
pub use error::{StorageError, StorageResult};
pub use frames::{EvictionReport, FrameSnapshot, FrameStore, StoredFrame, SNAPSHOT_PREFIX};
pub use layout::{OutputLayout, FRAME_EXTENSION};
pub use videos::{superseded_same_day, StoredVideo, SweepReport, VideoStore, LATEST_ALIAS_STEM};
