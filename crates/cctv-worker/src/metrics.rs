//! Prometheus metrics for the capture and assembly pipeline.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    // Capture metrics
    pub const FRAMES_CAPTURED_TOTAL: &str = "cctv_frames_captured_total";
    pub const FRAMES_KEPT_TOTAL: &str = "cctv_frames_kept_total";
    pub const FRAMES_DISCARDED_TOTAL: &str = "cctv_frames_discarded_total";
    pub const FRAMES_EVICTED_TOTAL: &str = "cctv_frames_evicted_total";
    pub const CAPTURE_FAILURES_TOTAL: &str = "cctv_capture_failures_total";

    // Assembly metrics
    pub const VIDEOS_GENERATED_TOTAL: &str = "cctv_videos_generated_total";
    pub const VIDEOS_FAILED_TOTAL: &str = "cctv_videos_failed_total";
    pub const VIDEOS_PRUNED_TOTAL: &str = "cctv_videos_pruned_total";
    pub const ENCODE_DURATION_SECONDS: &str = "cctv_encode_duration_seconds";
}

/// Serve metrics over HTTP on `addr`.
pub fn install_exporter(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::MetricsFailed(e.to_string()))?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}

fn camera_label(camera_id: &str) -> [(&'static str, String); 1] {
    [("camera", camera_id.to_string())]
}

pub fn record_frame_captured(camera_id: &str) {
    counter!(names::FRAMES_CAPTURED_TOTAL, &camera_label(camera_id)).increment(1);
}

pub fn record_frame_kept(camera_id: &str) {
    counter!(names::FRAMES_KEPT_TOTAL, &camera_label(camera_id)).increment(1);
}

pub fn record_frame_discarded(camera_id: &str) {
    counter!(names::FRAMES_DISCARDED_TOTAL, &camera_label(camera_id)).increment(1);
}

pub fn record_frames_evicted(camera_id: &str, count: usize) {
    if count > 0 {
        counter!(names::FRAMES_EVICTED_TOTAL, &camera_label(camera_id)).increment(count as u64);
    }
}

pub fn record_capture_failure(camera_id: &str) {
    counter!(names::CAPTURE_FAILURES_TOTAL, &camera_label(camera_id)).increment(1);
}

pub fn record_video_generated(camera_id: &str, encode_secs: f64) {
    let labels = camera_label(camera_id);
    counter!(names::VIDEOS_GENERATED_TOTAL, &labels).increment(1);
    histogram!(names::ENCODE_DURATION_SECONDS, &labels).record(encode_secs);
}

pub fn record_video_failed(camera_id: &str) {
    counter!(names::VIDEOS_FAILED_TOTAL, &camera_label(camera_id)).increment(1);
}

pub fn record_videos_pruned(camera_id: &str, count: usize) {
    if count > 0 {
        counter!(names::VIDEOS_PRUNED_TOTAL, &camera_label(camera_id)).increment(count as u64);
    }
}
