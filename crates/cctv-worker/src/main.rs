//! CCTV summarizer binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use cctv_worker::{
    assemble_all, capture_once, init_tracing, inspect_camera, CaptureOutcome, Scheduler,
    SummarizerContext, WorkerConfig, DEFAULT_CONFIG_PATH,
};

/// Capture camera stills, drop motionless frames, and assemble summary videos.
#[derive(Parser, Debug)]
#[command(name = "cctv-summarizer", version, about)]
struct Args {
    /// Path to the YAML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the capture loop until interrupted (default)
    Run,
    /// Capture one frame from a camera
    Capture {
        /// Camera identifier from the config
        camera_id: String,
    },
    /// Generate a video for every camera now and exit
    GenerateVideos,
    /// Replay motion detection over stored frames
    TestChanges {
        /// Camera identifier; all cameras when omitted
        camera_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match WorkerConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("INFO");
            error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.settings().log_level);

    match run(args.command.unwrap_or(Command::Run), config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: WorkerConfig) -> anyhow::Result<ExitCode> {
    if let Some(addr) = config.settings().metrics_listen {
        if let Err(e) = cctv_worker::metrics::install_exporter(addr) {
            warn!("Metrics disabled: {}", e);
        }
    }

    let ctx = Arc::new(SummarizerContext::new(&config).await?);

    match command {
        Command::Run => {
            if let Err(e) = cctv_media::check_ffmpeg() {
                warn!("{}", e);
            }
            let scheduler = Arc::new(Scheduler::new(Arc::clone(&ctx)));
            let signal = Arc::clone(&scheduler);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                    signal.shutdown();
                }
            });
            scheduler.run().await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Capture { camera_id } => {
            let camera = ctx.camera(&camera_id)?.clone();
            info!("Testing capture from {}...", camera_id);
            match capture_once(&ctx, &camera).await? {
                CaptureOutcome::Stored(frame) => {
                    println!("Success! Frame saved to: {}", frame.path.display());
                    Ok(ExitCode::SUCCESS)
                }
                CaptureOutcome::Discarded => {
                    println!("Frame captured but discarded: no significant motion");
                    Ok(ExitCode::SUCCESS)
                }
                CaptureOutcome::Failed(reason) => {
                    eprintln!("Capture failed: {}", reason);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::GenerateVideos => {
            info!("Generating videos for all cameras...");
            let mut ok = true;
            for (camera_id, result) in assemble_all(&ctx).await {
                match result {
                    Ok(Some(video)) => println!("{}: {}", camera_id, video.path.display()),
                    Ok(None) => println!("{}: no video generated", camera_id),
                    Err(e) => {
                        error!(camera_id = %camera_id, "Error generating video: {}", e);
                        ok = false;
                    }
                }
            }
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::TestChanges { camera_id } => {
            let cameras = match camera_id {
                Some(id) => vec![ctx.camera(&id)?.clone()],
                None => ctx.cameras.clone(),
            };
            for camera in &cameras {
                let report = inspect_camera(&ctx, camera).await?;
                if report.frames.len() < 2 {
                    warn!(
                        camera_id = %camera.id,
                        "Not enough frames to test (found {})",
                        report.frames.len()
                    );
                    continue;
                }
                println!("{}", report);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
