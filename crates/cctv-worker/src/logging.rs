//! Tracing setup and structured per-camera logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map a configured log level name onto a tracing level directive.
///
/// Accepts DEBUG, INFO, WARNING, ERROR and CRITICAL in any case; anything
/// else falls back to `info`.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        _ => "info",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. `LOG_FORMAT=json` switches to
/// JSON lines.
pub fn init_tracing(log_level: &str) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(log_level)));

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    if result.is_ok() {
        info!("Logging configured at {} level", log_level);
    }
}

/// Logger carrying a camera id and operation on every event.
#[derive(Debug, Clone)]
pub struct CameraLogger {
    camera_id: String,
    operation: &'static str,
}

impl CameraLogger {
    pub fn new(camera_id: &str, operation: &'static str) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            camera_id = %self.camera_id,
            operation = self.operation,
            "Started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            camera_id = %self.camera_id,
            operation = self.operation,
            "{}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            camera_id = %self.camera_id,
            operation = self.operation,
            "{}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            camera_id = %self.camera_id,
            operation = self.operation,
            "Failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            camera_id = %self.camera_id,
            operation = self.operation,
            "Completed: {}", message
        );
    }

    /// Span for work that spans several awaits.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "camera",
            camera_id = %self.camera_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("debug"), "debug");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("chatty"), "info");
    }
}
