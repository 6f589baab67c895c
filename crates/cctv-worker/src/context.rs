//! Shared state for capture, assembly and inspection.

use std::sync::Arc;

use tracing::info;

use cctv_media::{FfmpegCapturer, FfmpegEncoder, FrameCapturer, MotionGate, VideoEncoder};
use cctv_models::{CameraConfig, MotionThresholds, SummarizerSettings, VideoEncoding};
use cctv_storage::{EmbedTemplate, FrameStore, OutputLayout, VideoStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Everything a camera's pipeline needs, built once at startup.
pub struct SummarizerContext {
    pub settings: SummarizerSettings,
    pub cameras: Vec<CameraConfig>,
    pub layout: OutputLayout,
    pub frames: FrameStore,
    pub videos: VideoStore,
    pub gate: MotionGate,
    pub encoding: VideoEncoding,
    pub capturer: Arc<dyn FrameCapturer>,
    pub encoder: Arc<dyn VideoEncoder>,
    pub embed_template: Option<EmbedTemplate>,
}

impl SummarizerContext {
    /// Build a context that shells out to ffmpeg.
    pub async fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        Self::with_collaborators(
            config,
            Arc::new(FfmpegCapturer::new()),
            Arc::new(FfmpegEncoder::new()),
        )
        .await
    }

    /// Build a context with the given capture and encode implementations.
    ///
    /// Creates the output directories and loads the embed template if one is
    /// configured.
    pub async fn with_collaborators(
        config: &WorkerConfig,
        capturer: Arc<dyn FrameCapturer>,
        encoder: Arc<dyn VideoEncoder>,
    ) -> WorkerResult<Self> {
        let settings = config.settings().clone();
        let cameras = config.cameras();
        let layout = config.layout();

        layout.prepare().await?;
        let frames = FrameStore::new(layout.frames_root());
        let videos = VideoStore::new(layout.videos_root(), settings.video_format.clone());
        for camera in &cameras {
            frames.prepare(&camera.id).await?;
            videos.prepare(&camera.id).await?;
        }

        let embed_template = match &config.iframe_template {
            Some(path) => EmbedTemplate::load_optional(path).await,
            None => None,
        };

        info!(
            cameras = cameras.len(),
            "Output directories ready under {}",
            layout.root().display()
        );

        Ok(Self {
            frames,
            videos,
            gate: MotionGate::with_cameras(cameras.iter().map(|c| c.id.clone())),
            encoding: config.encoding.clone(),
            settings,
            cameras,
            layout,
            capturer,
            encoder,
            embed_template,
        })
    }

    /// Look up a configured camera.
    pub fn camera(&self, camera_id: &str) -> WorkerResult<&CameraConfig> {
        self.cameras
            .iter()
            .find(|c| c.id == camera_id)
            .ok_or_else(|| WorkerError::unknown_camera(camera_id, self.camera_ids()))
    }

    pub fn camera_ids(&self) -> String {
        self.cameras
            .iter()
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Effective gate thresholds for a camera.
    pub fn thresholds(&self, camera: &CameraConfig) -> MotionThresholds {
        camera.thresholds(self.settings.default_thresholds())
    }
}
