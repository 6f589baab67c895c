//! Capture timestamps and their filename encoding.
//!
//! Frames and videos are identified by the second they were created. The
//! timestamp is encoded in the file stem as `YYYYMMDD_HHMMSS` (local time) and
//! the stem is the only place it is stored, so the mapping must stay exact in
//! both directions.

use std::fmt;
use std::path::Path;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

/// `strftime` pattern used for frame and video file stems.
pub const FILENAME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Path has no usable file stem: {0}")]
    MissingStem(String),

    #[error("Invalid timestamp '{0}', expected YYYYMMDD_HHMMSS")]
    InvalidFormat(String),
}

/// A second-resolution local timestamp that names a frame or video file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureTimestamp(NaiveDateTime);

impl CaptureTimestamp {
    /// Current local time, truncated to the second.
    pub fn now() -> Self {
        Self::from_naive(Local::now().naive_local())
    }

    /// Wrap a naive local datetime, dropping sub-second precision.
    pub fn from_naive(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// Parse a file stem such as `20231115_143022`.
    pub fn parse_stem(stem: &str) -> Result<Self, TimestampError> {
        NaiveDateTime::parse_from_str(stem, FILENAME_FORMAT)
            .map(Self)
            .map_err(|_| TimestampError::InvalidFormat(stem.to_string()))
    }

    /// Parse the timestamp encoded in a file path's stem.
    pub fn from_path(path: &Path) -> Result<Self, TimestampError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TimestampError::MissingStem(path.display().to_string()))?;
        Self::parse_stem(stem)
    }

    /// File stem for this timestamp.
    pub fn file_stem(&self) -> String {
        self.0.format(FILENAME_FORMAT).to_string()
    }

    /// File name with the given extension (without the dot).
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem(), extension)
    }

    /// Calendar date of this timestamp.
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Underlying naive datetime.
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Shift back by a std duration, saturating on overflow.
    pub fn saturating_sub(&self, duration: std::time::Duration) -> Self {
        Self(
            chrono::Duration::from_std(duration)
                .ok()
                .and_then(|delta| self.0.checked_sub_signed(delta))
                .unwrap_or(NaiveDateTime::MIN),
        )
    }
}

impl fmt::Display for CaptureTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

impl From<NaiveDateTime> for CaptureTimestamp {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::from_naive(datetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn ts(stem: &str) -> CaptureTimestamp {
        CaptureTimestamp::parse_stem(stem).unwrap()
    }

    #[test]
    fn test_stem_is_exact() {
        let parsed = ts("20231115_143022");
        assert_eq!(parsed.file_stem(), "20231115_143022");
        assert_eq!(parsed.file_name("jpg"), "20231115_143022.jpg");
        assert_eq!(parsed.to_string(), "20231115_143022");
    }

    #[test]
    fn test_from_path() {
        let path = PathBuf::from("/data/frames/front_door/20240101_000001.jpg");
        assert_eq!(CaptureTimestamp::from_path(&path).unwrap(), ts("20240101_000001"));

        let bad = PathBuf::from("/data/frames/front_door/input_list_x.txt");
        assert!(matches!(
            CaptureTimestamp::from_path(&bad),
            Err(TimestampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_invalid_stems() {
        assert!(CaptureTimestamp::parse_stem("latest").is_err());
        assert!(CaptureTimestamp::parse_stem("20231315_143022").is_err());
        assert!(CaptureTimestamp::parse_stem("20231115-143022").is_err());
    }

    #[test]
    fn test_ordering_and_date() {
        let morning = ts("20240301_080000");
        let evening = ts("20240301_200000");
        let next_day = ts("20240302_000000");
        assert!(morning < evening && evening < next_day);
        assert_eq!(morning.date(), evening.date());
        assert_ne!(evening.date(), next_day.date());
    }

    #[test]
    fn test_saturating_sub() {
        let now = ts("20240302_010000");
        assert_eq!(now.saturating_sub(Duration::from_secs(3_600)), ts("20240302_000000"));
        assert_eq!(now.saturating_sub(Duration::from_secs(86_400)), ts("20240301_010000"));
    }

    #[test]
    fn test_now_has_whole_seconds() {
        let now = CaptureTimestamp::now();
        assert_eq!(now.as_naive().nanosecond(), 0);
    }
}
