//! Capture loop and per-camera assembly tasks.
//!
//! One loop walks every camera in turn on the capture interval. Each camera
//! also owns an assembly task on its own timer, so a slow encode never holds up
//! capture. Work for one camera runs in a spawned task and is awaited, which
//! contains panics to that camera's cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

use cctv_models::CameraConfig;

use crate::assembler::assemble;
use crate::capture::{capture_once, evict_expired, CaptureOutcome};
use crate::context::SummarizerContext;
use crate::error::WorkerResult;
use crate::logging::CameraLogger;

/// Pause after a loop-level failure.
pub const LOOP_BACKOFF: Duration = Duration::from_secs(5);

/// Counts from one capture tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub stored: usize,
    pub discarded: usize,
    pub failed: usize,
    pub evicted: usize,
}

/// Drives capture ticks and assembly timers until shutdown.
pub struct Scheduler {
    ctx: Arc<SummarizerContext>,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(ctx: Arc<SummarizerContext>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { ctx, shutdown }
    }

    pub fn context(&self) -> &Arc<SummarizerContext> {
        &self.ctx
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run until [`Scheduler::shutdown`] is called or a fatal error occurs.
    ///
    /// Other loop-level errors are logged and retried after [`LOOP_BACKOFF`].
    pub async fn run(&self) -> WorkerResult<()> {
        let settings = &self.ctx.settings;
        info!(
            cameras = self.ctx.cameras.len(),
            "Starting capture loop: capture every {:?}, videos every {:?}, keeping {:?}",
            settings.capture_interval,
            settings.video_generation_interval,
            settings.summary_duration
        );

        let assembly_tasks: Vec<JoinHandle<()>> = self
            .ctx
            .cameras
            .iter()
            .map(|camera| {
                tokio::spawn(assembly_loop(
                    Arc::clone(&self.ctx),
                    camera.id.clone(),
                    settings.video_generation_interval,
                    self.shutdown.subscribe(),
                ))
            })
            .collect();

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut ticker = interval(settings.capture_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut outcome = Ok(());

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping capture loop");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(summary) => debug!(
                            stored = summary.stored,
                            discarded = summary.discarded,
                            failed = summary.failed,
                            evicted = summary.evicted,
                            "Capture tick done"
                        ),
                        Err(e) if e.is_fatal() => {
                            error!("Fatal error in capture loop: {}", e);
                            outcome = Err(e);
                            break;
                        }
                        Err(e) => {
                            error!("Error in capture loop: {}", e);
                            tokio::time::sleep(LOOP_BACKOFF).await;
                        }
                    }
                }
            }
        }

        for task in assembly_tasks {
            task.abort();
        }

        info!("Capture loop stopped");
        outcome
    }

    /// Capture, gate, store and evict for every camera, one after another.
    ///
    /// Failures and panics inside one camera's cycle are logged and do not
    /// affect the others.
    pub async fn tick(&self) -> WorkerResult<TickSummary> {
        tokio::fs::create_dir_all(self.ctx.layout.staging_root()).await?;

        let mut summary = TickSummary::default();
        for camera in &self.ctx.cameras {
            let ctx = Arc::clone(&self.ctx);
            let span = CameraLogger::new(&camera.id, "capture").create_span();
            let cycle = tokio::spawn(camera_cycle(ctx, camera.clone()).instrument(span));

            match cycle.await {
                Ok((outcome, evicted)) => {
                    match outcome {
                        Some(CaptureOutcome::Stored(_)) => summary.stored += 1,
                        Some(CaptureOutcome::Discarded) => summary.discarded += 1,
                        Some(CaptureOutcome::Failed(_)) | None => summary.failed += 1,
                    }
                    summary.evicted += evicted;
                }
                Err(e) => {
                    error!(camera_id = %camera.id, "Capture cycle panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }
}

/// Capture then evict for one camera; errors are logged here.
async fn camera_cycle(ctx: Arc<SummarizerContext>, camera: CameraConfig) -> (Option<CaptureOutcome>, usize) {
    let outcome = match capture_once(&ctx, &camera).await {
        Ok(outcome) => Some(outcome),
        Err(e) if e.is_transient() => {
            warn!(camera_id = %camera.id, "Capture cycle failed, retrying next tick: {}", e);
            None
        }
        Err(e) => {
            error!(camera_id = %camera.id, "Error capturing frame: {}", e);
            None
        }
    };

    let evicted = match evict_expired(&ctx, &camera.id).await {
        Ok(report) => report.deleted,
        Err(e) => {
            warn!(camera_id = %camera.id, "Error evicting old frames: {}", e);
            0
        }
    };

    (outcome, evicted)
}

/// Assemble one camera's video every `period`, first one period after start.
async fn assembly_loop(
    ctx: Arc<SummarizerContext>,
    camera_id: String,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let ctx = Arc::clone(&ctx);
                let id = camera_id.clone();
                let span = CameraLogger::new(&camera_id, "assemble").create_span();
                let run = tokio::spawn(async move { assemble(&ctx, &id).await }.instrument(span));
                match run.await {
                    Ok(Ok(Some(video))) => {
                        debug!(camera_id = %camera_id, "Assembled {}", video.path.display())
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) if e.is_transient() => {
                        warn!(camera_id = %camera_id, "Video assembly failed, retrying next interval: {}", e)
                    }
                    Ok(Err(e)) => error!(camera_id = %camera_id, "Error generating video: {}", e),
                    Err(e) => error!(camera_id = %camera_id, "Video assembly panicked: {}", e),
                }
            }
        }
    }
}
