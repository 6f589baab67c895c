//! One capture cycle for one camera: capture, gate, store or discard.

use std::path::Path;

use tempfile::TempPath;
use tracing::debug;

use cctv_models::{CameraConfig, CaptureTimestamp};
use cctv_storage::{EvictionReport, StoredFrame};

use crate::context::SummarizerContext;
use crate::error::WorkerResult;
use crate::logging::CameraLogger;
use crate::metrics;

/// What happened to one capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The frame was retained
    Stored(StoredFrame),
    /// The motion gate found nothing worth keeping
    Discarded,
    /// No frame was obtained this cycle
    Failed(String),
}

impl CaptureOutcome {
    /// Path of the retained frame, if any.
    pub fn stored_path(&self) -> Option<&Path> {
        match self {
            CaptureOutcome::Stored(frame) => Some(&frame.path),
            _ => None,
        }
    }
}

/// Capture a frame from `camera` and keep it if it passes the gate.
///
/// Capture failures are reported as [`CaptureOutcome::Failed`]; only storage
/// errors are returned as `Err`.
pub async fn capture_once(ctx: &SummarizerContext, camera: &CameraConfig) -> WorkerResult<CaptureOutcome> {
    let logger = CameraLogger::new(&camera.id, "capture");
    let timestamp = CaptureTimestamp::now();

    tokio::fs::create_dir_all(ctx.layout.staging_root()).await?;
    let staged = ctx.layout.staging_frame(&camera.id)?;

    if let Err(e) = ctx.capturer.capture(&camera.url, &staged).await {
        metrics::record_capture_failure(&camera.id);
        logger.log_warning(&format!("capture failed: {}", e));
        discard_staged(staged);
        return Ok(CaptureOutcome::Failed(e.to_string()));
    }
    metrics::record_frame_captured(&camera.id);

    if camera.track_changes {
        let verdict = ctx
            .gate
            .evaluate(&camera.id, &staged, ctx.thresholds(camera))
            .await;
        if !verdict.keep() {
            metrics::record_frame_discarded(&camera.id);
            debug!(camera_id = %camera.id, "No significant motion, discarding frame");
            discard_staged(staged);
            return Ok(CaptureOutcome::Discarded);
        }
    }

    let frame = ctx.frames.append(&camera.id, timestamp, &staged).await?;
    // Moved into the store; nothing left to clean up
    let _ = staged.keep();
    metrics::record_frame_kept(&camera.id);
    logger.log_progress(&format!("frame saved to {}", frame.path.display()));
    Ok(CaptureOutcome::Stored(frame))
}

/// Drop frames older than the summary window.
pub async fn evict_expired(ctx: &SummarizerContext, camera_id: &str) -> WorkerResult<EvictionReport> {
    let report = ctx
        .frames
        .evict_expired(camera_id, CaptureTimestamp::now(), ctx.settings.summary_duration)
        .await?;
    metrics::record_frames_evicted(camera_id, report.deleted);
    Ok(report)
}

fn discard_staged(staged: TempPath) {
    let path = staged.to_path_buf();
    if let Err(e) = staged.close() {
        debug!("Failed to remove staged capture {}: {}", path.display(), e);
    }
}
