use std::path::{Path, PathBuf};
use std::process::Command;

use cctv_worker::{WorkerConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    println!("cctv-selfcheck: loading {}", config_path.display());
    let config = WorkerConfig::load(&config_path)?;
    println!(
        "cctv-selfcheck: cameras {}",
        config.summarizer.camera_ids()
    );

    ensure_writable(&config.settings().output_path).await?;
    ensure_ffmpeg()?;
    if let Some(template) = &config.iframe_template {
        if !template.exists() {
            println!(
                "cctv-selfcheck: warning: embed template {} not found",
                template.display()
            );
        }
    }

    println!("cctv-selfcheck: ok");
    Ok(())
}

async fn ensure_writable(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let marker = path.join(".selfcheck");
    tokio::fs::write(&marker, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("output path {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg -version failed: {:?}",
            output.status
        ));
    }
    Ok(())
}
