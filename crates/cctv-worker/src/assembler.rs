//! Summary video assembly and same-day video retention.

use std::time::Instant;

use cctv_media::{write_playlist, EncodeJob};
use cctv_models::CaptureTimestamp;
use cctv_storage::StoredVideo;

use crate::context::SummarizerContext;
use crate::error::WorkerResult;
use crate::logging::CameraLogger;
use crate::metrics;

/// Fewest frames worth turning into a video.
pub const MIN_FRAMES: usize = 2;

/// Build one summary video from a camera's retained frames.
///
/// The frames are pinned in a snapshot for the whole encode, so frames
/// evicted meanwhile still make it into the video.
///
/// Returns `Ok(None)` when there are too few frames or the encode fails; in
/// the latter case any partial output is removed. After a successful encode
/// the latest alias and embed page are refreshed (if enabled) and older
/// videos from the same day are deleted.
pub async fn assemble(ctx: &SummarizerContext, camera_id: &str) -> WorkerResult<Option<StoredVideo>> {
    let logger = CameraLogger::new(camera_id, "assemble");

    let snapshot = ctx.frames.snapshot(camera_id).await?;
    if snapshot.len() < MIN_FRAMES {
        logger.log_progress(&format!(
            "not enough frames to generate video (found {})",
            snapshot.len()
        ));
        return Ok(None);
    }

    let timestamp = CaptureTimestamp::now();
    let output = ctx.videos.video_path(camera_id, timestamp);
    ctx.videos.prepare(camera_id).await?;

    let paths = snapshot.paths();
    let playlist = write_playlist(snapshot.dir(), &paths)?;

    logger.log_start(&format!("encoding {} frames", paths.len()));
    let started = Instant::now();
    let result = ctx
        .encoder
        .encode(EncodeJob {
            playlist: playlist.path(),
            frame_count: paths.len(),
            output: &output,
            encoding: &ctx.encoding,
        })
        .await;
    drop(playlist);
    drop(snapshot);

    if let Err(e) = result {
        metrics::record_video_failed(camera_id);
        logger.log_error(&e.to_string());
        ctx.videos.discard_partial(&output).await;
        return Ok(None);
    }

    metrics::record_video_generated(camera_id, started.elapsed().as_secs_f64());
    logger.log_completion(&format!("video generated: {}", output.display()));
    let video = StoredVideo {
        timestamp,
        path: output,
    };

    if let Some(template) = &ctx.embed_template {
        if let Err(e) = ctx.videos.write_embed_page(camera_id, &video, template).await {
            logger.log_warning(&format!("embed page not written: {}", e));
        }
    }

    if ctx.settings.create_latest_link {
        if let Err(e) = ctx.videos.refresh_latest_alias(camera_id, &video).await {
            logger.log_warning(&format!("latest alias not updated: {}", e));
        }
    }

    match ctx.videos.sweep_same_day(camera_id).await {
        Ok(report) => metrics::record_videos_pruned(camera_id, report.deleted),
        Err(e) => logger.log_warning(&format!("same-day sweep failed: {}", e)),
    }

    Ok(Some(video))
}

/// Assemble every camera once, in configuration order.
pub async fn assemble_all(ctx: &SummarizerContext) -> Vec<(String, WorkerResult<Option<StoredVideo>>)> {
    let mut results = Vec::with_capacity(ctx.cameras.len());
    for camera in &ctx.cameras {
        results.push((camera.id.clone(), assemble(ctx, &camera.id).await));
    }
    results
}
