//! Replay the motion gate over stored frames and report what it would keep.

use std::fmt;

use cctv_media::{GateDecision, MotionAnalysis, MotionGate};
use cctv_models::{CameraConfig, MotionThresholds};
use cctv_storage::StoredFrame;

use crate::context::SummarizerContext;
use crate::error::WorkerResult;

/// How many of the largest regions to list per frame.
const TOP_REGIONS: usize = 5;

/// Gate result for one stored frame.
#[derive(Debug, Clone)]
pub struct FrameInspection {
    pub frame: StoredFrame,
    pub decision: GateDecision,
    pub analysis: Option<MotionAnalysis>,
}

impl FrameInspection {
    pub fn kept(&self) -> bool {
        self.decision != GateDecision::NoMotion
    }
}

/// Inspection of one camera's stored frames.
#[derive(Debug, Clone)]
pub struct InspectionReport {
    pub camera_id: String,
    pub track_changes: bool,
    pub thresholds: MotionThresholds,
    pub frames: Vec<FrameInspection>,
}

impl InspectionReport {
    pub fn kept(&self) -> usize {
        self.frames.iter().filter(|f| f.kept()).count()
    }

    pub fn discarded(&self) -> usize {
        self.frames.len() - self.kept()
    }

    pub fn kept_percentage(&self) -> f64 {
        percentage(self.kept(), self.frames.len())
    }

    pub fn discarded_percentage(&self) -> f64 {
        percentage(self.discarded(), self.frames.len())
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Run a fresh gate over every stored frame of `camera`, oldest first.
///
/// The live gate's reference frames are not touched.
pub async fn inspect_camera(ctx: &SummarizerContext, camera: &CameraConfig) -> WorkerResult<InspectionReport> {
    let thresholds = ctx.thresholds(camera);
    let frames = ctx.frames.list_ordered(&camera.id).await?;
    let gate = MotionGate::new();

    let mut inspected = Vec::with_capacity(frames.len());
    for frame in frames {
        let verdict = gate.evaluate(&camera.id, &frame.path, thresholds).await;
        inspected.push(FrameInspection {
            frame,
            decision: verdict.decision,
            analysis: verdict.analysis,
        });
    }

    Ok(InspectionReport {
        camera_id: camera.id.clone(),
        track_changes: camera.track_changes,
        thresholds,
        frames: inspected,
    })
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Motion detection for camera: {}", self.camera_id)?;
        writeln!(f, "Total frames: {}", self.frames.len())?;
        writeln!(f, "Track changes enabled: {}", self.track_changes)?;
        writeln!(
            f,
            "Thresholds: pixel delta > {}, region area > {}",
            self.thresholds.pixel_threshold, self.thresholds.min_area
        )?;
        writeln!(f, "{}", rule)?;

        for (i, inspection) in self.frames.iter().enumerate() {
            writeln!(
                f,
                "[{}/{}] {} -> {}",
                i + 1,
                self.frames.len(),
                inspection.frame.timestamp,
                inspection.decision.as_str()
            )?;
            if let Some(analysis) = &inspection.analysis {
                writeln!(
                    f,
                    "    mean diff {:.2}, max diff {}, changed pixels {} ({:.2}%)",
                    analysis.mean_diff,
                    analysis.max_diff,
                    analysis.changed_pixels,
                    analysis.change_percentage()
                )?;
                writeln!(
                    f,
                    "    regions {}, significant {}, largest {:?}",
                    analysis.region_areas.len(),
                    analysis.significant_regions(),
                    analysis.top_regions(TOP_REGIONS)
                )?;
            }
        }

        writeln!(f, "{}", rule)?;
        writeln!(f, "Summary for {}:", self.camera_id)?;
        writeln!(f, "  Total frames: {}", self.frames.len())?;
        writeln!(f, "  Would keep: {} ({:.1}%)", self.kept(), self.kept_percentage())?;
        writeln!(
            f,
            "  Would discard: {} ({:.1}%)",
            self.discarded(),
            self.discarded_percentage()
        )?;
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cctv_models::CaptureTimestamp;
    use std::path::PathBuf;

    fn inspection(decision: GateDecision) -> FrameInspection {
        FrameInspection {
            frame: StoredFrame {
                timestamp: CaptureTimestamp::parse_stem("20240101_000000").unwrap(),
                path: PathBuf::from("20240101_000000.jpg"),
            },
            decision,
            analysis: None,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = InspectionReport {
            camera_id: "garage".into(),
            track_changes: true,
            thresholds: MotionThresholds::default(),
            frames: vec![
                inspection(GateDecision::ColdStart),
                inspection(GateDecision::NoMotion),
                inspection(GateDecision::NoMotion),
                inspection(GateDecision::Motion),
            ],
        };
        assert_eq!(report.kept(), 2);
        assert_eq!(report.discarded(), 2);
        assert!((report.kept_percentage() - 50.0).abs() < f64::EPSILON);

        let text = report.to_string();
        assert!(text.contains("Would keep: 2 (50.0%)"));
        assert!(text.contains("[2/4] 20240101_000000 -> no_motion"));
    }

    #[test]
    fn test_empty_report() {
        let report = InspectionReport {
            camera_id: "garage".into(),
            track_changes: false,
            thresholds: MotionThresholds::default(),
            frames: Vec::new(),
        };
        assert_eq!(report.kept_percentage(), 0.0);
        assert_eq!(report.discarded(), 0);
    }
}
