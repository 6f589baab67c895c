//! Worker configuration.
//!
//! The document is read from a YAML file and may be overridden through
//! `CCTV__`-prefixed environment variables, e.g.
//! `CCTV__CONFIG__CAPTURE_INTERVAL=30s` or
//! `CCTV__CAMERAS__FRONT_DOOR__URL=rtsp://...`.
//!
//! The `config` crate folds every key to lower case. Camera identifiers name
//! directories on disk, so the camera map is read a second time straight from
//! the YAML to recover the identifiers as written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{info, warn};

use cctv_models::{CameraConfig, SummarizerConfig, SummarizerSettings, VideoEncoding};
use cctv_storage::OutputLayout;

use crate::error::{WorkerError, WorkerResult};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "CCTV";

/// Checked configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub summarizer: SummarizerConfig,
    /// File the document was read from
    pub source: PathBuf,
    /// Embed template path, resolved against the config file's directory
    pub iframe_template: Option<PathBuf>,
    /// Encoding derived from the settings
    pub encoding: VideoEncoding,
}

impl WorkerConfig {
    /// Load, override from the environment, and check the document at `path`.
    pub fn load(path: &Path) -> WorkerResult<Self> {
        if !path.exists() {
            return Err(WorkerError::config_error(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let mut summarizer: SummarizerConfig = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        let declared = declared_cameras(path)?;
        summarizer.cameras = restore_camera_ids(declared, summarizer.cameras);

        let config = Self::from_document(summarizer, path)?;
        info!(
            "Loaded config from {} with cameras: {}",
            path.display(),
            config.summarizer.camera_ids()
        );
        Ok(config)
    }

    /// Check an already parsed document.
    pub fn from_document(summarizer: SummarizerConfig, source: &Path) -> WorkerResult<Self> {
        summarizer.check()?;
        let encoding = summarizer.config.encoding().map_err(cctv_models::SettingsError::from)?;
        let iframe_template = summarizer
            .config
            .iframe_template
            .as_deref()
            .map(|template| resolve_relative(template, source));

        Ok(Self {
            summarizer,
            source: source.to_path_buf(),
            iframe_template,
            encoding,
        })
    }

    pub fn settings(&self) -> &SummarizerSettings {
        &self.summarizer.config
    }

    pub fn cameras(&self) -> Vec<CameraConfig> {
        self.summarizer.camera_list()
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.settings().output_path)
    }
}

/// The `cameras` section exactly as written in the file.
#[derive(Debug, Default, Deserialize)]
struct CameraSection {
    #[serde(default)]
    cameras: Option<BTreeMap<String, CameraConfig>>,
}

fn declared_cameras(path: &Path) -> WorkerResult<BTreeMap<String, CameraConfig>> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let section: CameraSection = serde_yaml::from_str(&contents).map_err(|e| {
        WorkerError::config_error(format!("{}: {}", path.display(), e))
    })?;
    Ok(section.cameras.unwrap_or_default())
}

/// Put the declared identifiers back on the merged, lower-cased camera map.
///
/// A merged entry takes the identifier of the one declared camera that folds
/// onto it, keeping its environment overrides. Entries that no declared
/// camera folds onto came from the environment alone and stay as they are.
/// When several declared cameras fold onto the same key their merged entry
/// is ambiguous, so the declared ones are used unchanged.
fn restore_camera_ids(
    declared: BTreeMap<String, CameraConfig>,
    merged: BTreeMap<String, CameraConfig>,
) -> BTreeMap<String, CameraConfig> {
    let mut cameras = BTreeMap::new();
    let mut ambiguous = Vec::new();

    for (key, camera) in merged {
        let mut folding = declared.keys().filter(|id| id.to_lowercase() == key);
        match (folding.next(), folding.next()) {
            (None, _) => {
                cameras.insert(key, camera);
            }
            (Some(id), None) => {
                cameras.insert(id.clone(), camera);
            }
            _ => ambiguous.push(key),
        }
    }

    for (id, camera) in declared {
        if ambiguous.contains(&id.to_lowercase()) {
            warn!(
                camera_id = %id,
                "Camera ids differ only in case; environment overrides are ignored for them"
            );
            cameras.insert(id, camera);
        }
    }
    cameras
}

/// Resolve `path` against the directory containing `config_file`.
fn resolve_relative(path: &Path, config_file: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    config_file
        .parent()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|| path.to_path_buf())
}
