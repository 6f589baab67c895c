//! Frame differencing and connected-region extraction.
//!
//! Two grayscale rasters are compared pixel by pixel; pixels whose absolute
//! delta exceeds the pixel threshold form a binary mask, and the mask is split
//! into 8-connected regions. A frame has motion when any single region is
//! larger than the minimum area, so scattered sensor noise never adds up to a
//! detection.

use image::imageops::{self, FilterType};
use image::GrayImage;

use cctv_models::MotionThresholds;

/// Result of comparing one frame against a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionAnalysis {
    /// Whether some region is larger than `thresholds.min_area`
    pub has_motion: bool,
    /// Thresholds the comparison ran with
    pub thresholds: MotionThresholds,
    /// Mean absolute pixel delta
    pub mean_diff: f64,
    /// Largest absolute pixel delta
    pub max_diff: u8,
    /// Pixels whose delta exceeded the pixel threshold
    pub changed_pixels: u64,
    /// Pixels compared
    pub total_pixels: u64,
    /// Areas of all changed regions, largest first
    pub region_areas: Vec<u32>,
}

impl MotionAnalysis {
    /// Share of changed pixels, in percent.
    pub fn change_percentage(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.changed_pixels as f64 / self.total_pixels as f64 * 100.0
    }

    /// Number of regions above the minimum area.
    pub fn significant_regions(&self) -> usize {
        self.region_areas
            .iter()
            .take_while(|&&area| area > self.thresholds.min_area)
            .count()
    }

    /// The `n` largest region areas.
    pub fn top_regions(&self, n: usize) -> &[u32] {
        &self.region_areas[..n.min(self.region_areas.len())]
    }
}

/// Compare `current` against `reference`.
///
/// A reference with different dimensions is resampled to the current frame's
/// size first; the caller's reference is not modified.
pub fn analyze(reference: &GrayImage, current: &GrayImage, thresholds: MotionThresholds) -> MotionAnalysis {
    let (width, height) = current.dimensions();

    let resized;
    let reference = if reference.dimensions() != (width, height) {
        resized = imageops::resize(reference, width, height, FilterType::Triangle);
        &resized
    } else {
        reference
    };

    let total_pixels = u64::from(width) * u64::from(height);
    let mut mask = Vec::with_capacity(total_pixels as usize);
    let mut diff_sum: u64 = 0;
    let mut max_diff: u8 = 0;
    let mut changed_pixels: u64 = 0;

    for (before, after) in reference.as_raw().iter().zip(current.as_raw().iter()) {
        let diff = before.abs_diff(*after);
        diff_sum += u64::from(diff);
        max_diff = max_diff.max(diff);
        let changed = diff > thresholds.pixel_threshold;
        if changed {
            changed_pixels += 1;
        }
        mask.push(changed);
    }

    let mut region_areas = connected_regions(&mask, width as usize, height as usize);
    region_areas.sort_unstable_by(|a, b| b.cmp(a));

    let has_motion = region_areas
        .first()
        .map(|&largest| largest > thresholds.min_area)
        .unwrap_or(false);

    MotionAnalysis {
        has_motion,
        thresholds,
        mean_diff: if total_pixels == 0 {
            0.0
        } else {
            diff_sum as f64 / total_pixels as f64
        },
        max_diff,
        changed_pixels,
        total_pixels,
        region_areas,
    }
}

/// Pixel counts of the 8-connected regions of `true` cells in a row-major mask.
pub fn connected_regions(mask: &[bool], width: usize, height: usize) -> Vec<u32> {
    debug_assert_eq!(mask.len(), width * height);

    let mut visited = vec![false; mask.len()];
    let mut areas = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let mut area: u32 = 0;

        while let Some(index) = stack.pop() {
            area += 1;
            let x = index % width;
            let y = index / width;

            let x_min = x.saturating_sub(1);
            let x_max = (x + 1).min(width - 1);
            let y_min = y.saturating_sub(1);
            let y_max = (y + 1).min(height - 1);

            for ny in y_min..=y_max {
                for nx in x_min..=x_max {
                    let neighbour = ny * width + nx;
                    if mask[neighbour] && !visited[neighbour] {
                        visited[neighbour] = true;
                        stack.push(neighbour);
                    }
                }
            }
        }

        areas.push(area);
    }

    areas
}
