//! Video summary binary.
//!
//! Runs the default selection pipeline over a video manifest and writes the
//! summary manifest and the final decision store.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vsumm_core::{Summarizer, SummarizerConfig, SummaryError, SummaryOptions, SummaryResult};
use vsumm_media::FfmpegFrameProvider;
use vsumm_ml_client::MlClient;
use vsumm_models::{dump_videos, load_videos};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vsumm=info".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vsumm");

    if let Err(e) = run().await {
        error!("Summary failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> SummaryResult<()> {
    let manifest = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VSUMM_MANIFEST").ok())
        .map(PathBuf::from)
        .ok_or_else(|| {
            SummaryError::config_error("pass a manifest path or set VSUMM_MANIFEST")
        })?;
    let summary_path = std::env::var("VSUMM_SUMMARY_PATH")
        .unwrap_or_else(|_| "summary.json".to_string());
    let title = std::env::var("VSUMM_TITLE").unwrap_or_else(|_| "summary".to_string());
    let ffmpeg_timeout = std::env::var("VSUMM_FFMPEG_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);

    let config = SummarizerConfig::from_env();
    info!("Summarizer config: {:?}", config);

    let videos = load_videos(&manifest, None)?;

    let ml = Arc::new(
        MlClient::from_env()
            .map_err(|e| SummaryError::config_error(format!("ML client: {}", e)))?,
    );
    match ml.health_check().await {
        Ok(true) => info!(url = %ml.config().base_url, "ML service is healthy"),
        Ok(false) => warn!(url = %ml.config().base_url, "ML service reports unhealthy"),
        Err(e) => warn!(url = %ml.config().base_url, "ML service health check failed: {}", e),
    }

    let frames = Arc::new(FfmpegFrameProvider::new().with_timeout(ffmpeg_timeout));
    let summarizer = Summarizer::with_default_extractor(&config, frames, ml.clone(), ml)?;

    let mut options = SummaryOptions::new(title).with_video_output_path(
        std::env::var("VSUMM_VIDEO_OUTPUT_PATH").unwrap_or_else(|_| "summary.mp4".to_string()),
    );
    if let Ok(store_path) = std::env::var("VSUMM_STORE_PATH") {
        options = options.with_store_path(store_path);
    }

    let summary = summarizer.summarize(videos, &options).await?;
    dump_videos(std::slice::from_ref(&summary.video), &summary_path)?;

    info!(
        segments = summary.video.segments().len(),
        summary = %summary_path,
        "Summary written"
    );
    Ok(())
}
