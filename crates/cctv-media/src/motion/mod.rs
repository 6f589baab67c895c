//! Motion gating.
//!
//! The gate keeps one grayscale reference frame per camera, the last frame that
//! was *kept*. A new frame is compared against it and kept only when it shows
//! motion, in which case it becomes the new reference. Frames without motion
//! leave the reference untouched, so a camera with no activity keeps comparing
//! against the first frame it ever kept.
//!
//! Each camera's reference lives in its own async mutex; every evaluation for a
//! camera holds that lock from lookup to update, so evaluations for the same
//! camera never interleave.

pub mod analysis;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::GrayImage;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use cctv_models::MotionThresholds;

use crate::error::{MediaError, MediaResult};

pub use analysis::{analyze, connected_regions, MotionAnalysis};

type ReferenceSlot = Arc<AsyncMutex<Option<GrayImage>>>;

/// Why the gate kept or discarded a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No reference yet; the frame became the reference
    ColdStart,
    /// A region exceeded the minimum area; the frame became the reference
    Motion,
    /// No region exceeded the minimum area
    NoMotion,
    /// The frame could not be decoded and is kept as is
    Undecodable,
}

impl GateDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::ColdStart => "cold_start",
            GateDecision::Motion => "motion",
            GateDecision::NoMotion => "no_motion",
            GateDecision::Undecodable => "undecodable",
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone)]
pub struct GateVerdict {
    pub decision: GateDecision,
    /// Comparison details, present when a reference existed
    pub analysis: Option<MotionAnalysis>,
}

impl GateVerdict {
    fn bare(decision: GateDecision) -> Self {
        Self {
            decision,
            analysis: None,
        }
    }

    /// Whether the frame should be retained.
    pub fn keep(&self) -> bool {
        self.decision != GateDecision::NoMotion
    }
}

/// Per-camera motion gate.
#[derive(Debug, Default)]
pub struct MotionGate {
    slots: Mutex<HashMap<String, ReferenceSlot>>,
}

impl MotionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate with empty slots for the given cameras.
    pub fn with_cameras<I, S>(camera_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = camera_ids
            .into_iter()
            .map(|id| (id.into(), ReferenceSlot::default()))
            .collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    fn slot(&self, camera_id: &str) -> ReferenceSlot {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(camera_id.to_string()).or_default())
    }

    /// Decide whether the frame stored at `frame_path` should be kept.
    ///
    /// A frame that cannot be decoded is kept and the reference is unchanged.
    pub async fn evaluate(&self, camera_id: &str, frame_path: &Path, thresholds: MotionThresholds) -> GateVerdict {
        let path = frame_path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || decode_grayscale(&path)).await;

        let verdict = match decoded {
            Ok(Ok(frame)) => self.evaluate_image(camera_id, frame, thresholds).await,
            Ok(Err(e)) => {
                warn!(camera_id = %camera_id, "Could not read frame, keeping it: {}", e);
                GateVerdict::bare(GateDecision::Undecodable)
            }
            Err(e) => {
                error!(camera_id = %camera_id, "Frame decode aborted, keeping frame: {}", e);
                GateVerdict::bare(GateDecision::Undecodable)
            }
        };
        debug!(
            camera_id = %camera_id,
            decision = verdict.decision.as_str(),
            "Motion gate evaluated {}",
            frame_path.display()
        );
        verdict
    }

    /// Decide whether an already decoded frame should be kept.
    pub async fn evaluate_image(&self, camera_id: &str, frame: GrayImage, thresholds: MotionThresholds) -> GateVerdict {
        let guard = self.slot(camera_id).lock_owned().await;
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard: OwnedMutexGuard<Option<GrayImage>> = guard;
            decide(&mut guard, frame, thresholds)
        })
        .await;

        outcome.unwrap_or_else(|e| {
            error!(camera_id = %camera_id, "Motion evaluation aborted, keeping frame: {}", e);
            GateVerdict::bare(GateDecision::Undecodable)
        })
    }

    /// Copy of the current reference frame for a camera.
    pub async fn reference(&self, camera_id: &str) -> Option<GrayImage> {
        self.slot(camera_id).lock().await.clone()
    }
}

fn decide(slot: &mut Option<GrayImage>, frame: GrayImage, thresholds: MotionThresholds) -> GateVerdict {
    let Some(reference) = slot.as_ref() else {
        *slot = Some(frame);
        return GateVerdict::bare(GateDecision::ColdStart);
    };

    let analysis = analyze(reference, &frame, thresholds);
    let decision = if analysis.has_motion {
        *slot = Some(frame);
        GateDecision::Motion
    } else {
        GateDecision::NoMotion
    };

    GateVerdict {
        decision,
        analysis: Some(analysis),
    }
}

/// Decode an image file into 8-bit grayscale, sniffing the format from content.
pub fn decode_grayscale(path: &Path) -> MediaResult<GrayImage> {
    let image = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| MediaError::decode(path, e.to_string()))?;

    Ok(image.to_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::TempDir;

    fn flat(value: u8) -> GrayImage {
        GrayImage::from_pixel(120, 90, Luma([value]))
    }

    fn with_block(base: &GrayImage, x0: u32, y0: u32, side: u32, delta: u8) -> GrayImage {
        let mut image = base.clone();
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                let pixel = image.get_pixel_mut(x, y);
                pixel.0[0] = pixel.0[0].saturating_add(delta);
            }
        }
        image
    }

    #[tokio::test]
    async fn test_cold_start_keeps_first_frame() {
        let gate = MotionGate::with_cameras(["front_door"]);
        let first = flat(70);

        let verdict = gate
            .evaluate_image("front_door", first.clone(), MotionThresholds::default())
            .await;
        assert!(verdict.keep());
        assert_eq!(verdict.decision, GateDecision::ColdStart);
        assert!(verdict.analysis.is_none());
        assert_eq!(gate.reference("front_door").await, Some(first));
    }

    #[tokio::test]
    async fn test_front_door_block_updates_reference() {
        let gate = MotionGate::new();
        let thresholds = MotionThresholds {
            pixel_threshold: 25,
            min_area: 500,
        };
        let frame1 = flat(60);
        let frame2 = with_block(&frame1, 20, 20, 30, 40);

        gate.evaluate_image("front_door", frame1, thresholds).await;
        let verdict = gate.evaluate_image("front_door", frame2.clone(), thresholds).await;

        assert!(verdict.keep());
        assert_eq!(verdict.decision, GateDecision::Motion);
        assert_eq!(verdict.analysis.unwrap().region_areas, vec![900]);
        assert_eq!(gate.reference("front_door").await, Some(frame2));
    }

    #[tokio::test]
    async fn test_no_motion_keeps_old_reference() {
        let gate = MotionGate::new();
        let thresholds = MotionThresholds::default();
        let first = flat(60);

        gate.evaluate_image("garage", first.clone(), thresholds).await;
        // Slow drift below the pixel threshold
        let verdict = gate.evaluate_image("garage", flat(70), thresholds).await;
        assert!(!verdict.keep());
        assert_eq!(verdict.decision, GateDecision::NoMotion);

        let verdict = gate.evaluate_image("garage", flat(80), thresholds).await;
        assert!(!verdict.keep());
        assert_eq!(gate.reference("garage").await, Some(first));

        // Drift accumulated past the threshold against the first kept frame
        let verdict = gate.evaluate_image("garage", flat(90), thresholds).await;
        assert!(verdict.keep());
    }

    #[tokio::test]
    async fn test_cameras_are_independent() {
        let gate = MotionGate::new();
        let thresholds = MotionThresholds::default();

        gate.evaluate_image("a", flat(10), thresholds).await;
        let verdict = gate.evaluate_image("b", flat(200), thresholds).await;
        assert_eq!(verdict.decision, GateDecision::ColdStart);
        assert_eq!(gate.reference("a").await, Some(flat(10)));
    }

    #[tokio::test]
    async fn test_undecodable_file_is_kept_without_reference_update() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("20240101_000000.jpg");
        std::fs::write(&broken, b"definitely not a jpeg").unwrap();

        let gate = MotionGate::new();
        let verdict = gate
            .evaluate("front_door", &broken, MotionThresholds::default())
            .await;
        assert!(verdict.keep());
        assert_eq!(verdict.decision, GateDecision::Undecodable);
        assert!(gate.reference("front_door").await.is_none());
    }

    #[tokio::test]
    async fn test_evaluate_reads_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("20240101_000000.png");
        let second = dir.path().join("20240101_000100.png");
        flat(60).save(&first).unwrap();
        with_block(&flat(60), 0, 0, 40, 100).save(&second).unwrap();

        let gate = MotionGate::new();
        let thresholds = MotionThresholds::default();
        assert_eq!(
            gate.evaluate("cam", &first, thresholds).await.decision,
            GateDecision::ColdStart
        );
        assert_eq!(
            gate.evaluate("cam", &second, thresholds).await.decision,
            GateDecision::Motion
        );
    }

    #[tokio::test]
    async fn test_concurrent_evaluations_serialize() {
        let gate = Arc::new(MotionGate::new());
        let thresholds = MotionThresholds::default();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.evaluate_image("cam", flat(50), thresholds).await.decision
            }));
        }

        let mut cold_starts = 0;
        for handle in handles {
            if handle.await.unwrap() == GateDecision::ColdStart {
                cold_starts += 1;
            }
        }
        assert_eq!(cold_starts, 1);
    }
}
