//! Encode progress from FFmpeg's `-progress` stream.

/// Snapshot of one `-progress` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Set on the final block
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Share of `total_duration_ms` written so far, in percent.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

/// Expected output duration of a slideshow of `frames` stills at `fps`.
pub fn slideshow_duration_ms(frames: usize, fps: u32) -> i64 {
    if fps == 0 {
        return 0;
    }
    (frames as i64 * 1000) / fps as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_of_slideshow() {
        let total = slideshow_duration_ms(250, 25);
        assert_eq!(total, 10_000);

        let halfway = FfmpegProgress {
            frame: 125,
            out_time_ms: 5_000,
            ..Default::default()
        };
        assert!((halfway.percentage(total) - 50.0).abs() < 0.01);

        let overrun = FfmpegProgress {
            out_time_ms: 12_000,
            ..Default::default()
        };
        assert!((overrun.percentage(total) - 100.0).abs() < 0.01);
        assert_eq!(halfway.percentage(0), 0.0);
    }

    #[test]
    fn test_slideshow_duration() {
        assert_eq!(slideshow_duration_ms(1440, 25), 57_600);
        assert_eq!(slideshow_duration_ms(10, 0), 0);
    }
}
