//! Compact duration strings.
//!
//! Durations in the configuration document are written as an integer followed
//! by a unit suffix: `30s`, `1m`, `24h`, `7d`. A bare integer is read as
//! seconds.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Duration parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("Duration cannot be empty")]
    Empty,

    #[error("Invalid duration value in '{0}'")]
    InvalidValue(String),

    #[error("Unknown duration unit '{unit}' in '{input}' (use s, m, h or d)")]
    UnknownUnit { unit: char, input: String },
}

/// Parse a compact duration string into a [`Duration`].
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use cctv_models::duration::parse_duration;
/// assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    let last = trimmed.chars().last().ok_or(DurationError::Empty)?;

    let (digits, multiplier) = if last.is_ascii_digit() {
        (trimmed, 1)
    } else {
        let multiplier = match last {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            unit => {
                return Err(DurationError::UnknownUnit {
                    unit,
                    input: trimmed.to_string(),
                })
            }
        };
        (&trimmed[..trimmed.len() - last.len_utf8()], multiplier)
    };

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| DurationError::InvalidValue(trimmed.to_string()))?;

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| DurationError::InvalidValue(trimmed.to_string()))
}

/// Serde helper for fields holding a compact duration string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("2d").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_bare_integer_is_seconds() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration(" 90 ").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert!(matches!(
            parse_duration("5w"),
            Err(DurationError::UnknownUnit { unit: 'w', .. })
        ));
        assert!(matches!(parse_duration("h"), Err(DurationError::InvalidValue(_))));
        assert!(matches!(parse_duration("-1h"), Err(DurationError::InvalidValue(_))));
    }

    #[test]
    fn test_serde_helper() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize")]
            every: Duration,
        }

        let holder: Holder = serde_json::from_str(r#"{"every": "5m"}"#).unwrap();
        assert_eq!(holder.every, Duration::from_secs(300));

        let bare: Holder = serde_json::from_str(r#"{"every": 90}"#).unwrap();
        assert_eq!(bare.every, Duration::from_secs(90));

        let bad: Result<Holder, _> = serde_json::from_str(r#"{"every": "5x"}"#);
        assert!(bad.is_err());
    }
}
