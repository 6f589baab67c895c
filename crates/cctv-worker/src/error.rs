//! Worker error types.

use thiserror::Error;

use cctv_models::SettingsError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown camera '{camera}'. Available cameras: {available}")]
    UnknownCamera { camera: String, available: String },

    #[error("Metrics exporter failed: {0}")]
    MetricsFailed(String),

    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] cctv_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] cctv_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn unknown_camera(camera: impl Into<String>, available: impl Into<String>) -> Self {
        Self::UnknownCamera {
            camera: camera.into(),
            available: available.into(),
        }
    }

    /// Errors raised while loading configuration stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkerError::ConfigError(_) | WorkerError::Settings(_) | WorkerError::ConfigSource(_)
        )
    }

    /// Errors worth retrying on the next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_transient(),
            WorkerError::Storage(_) | WorkerError::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(WorkerError::config_error("bad").is_fatal());
        assert!(WorkerError::Settings(SettingsError::NoCameras).is_fatal());
        assert!(!WorkerError::unknown_camera("x", "a, b").is_fatal());

        let io = WorkerError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_transient());
        assert!(!io.is_fatal());
    }

    #[test]
    fn test_unknown_camera_lists_available() {
        let err = WorkerError::unknown_camera("attic", "front_door, garage");
        assert_eq!(
            err.to_string(),
            "Unknown camera 'attic'. Available cameras: front_door, garage"
        );
    }
}
