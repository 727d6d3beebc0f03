//! vct-ts - Voice Command Transcription service
//!
//! Accepts an uploaded audio clip on `POST /transcribe`, converts it with
//! ffmpeg, transcribes it with whisper.cpp, optionally normalizes the script
//! and classifies the utterance into a command label.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vct_common::config::{load_toml, resolve_config_path};
use vct_ts::config::{ConfigOverrides, ServiceConfig};
use vct_ts::services::{ChatCompletionClassifier, Classifier, SystemProcessRunner};
use vct_ts::workflow::Pipeline;
use vct_ts::{build_router, AppState};

/// Voice command transcription service
#[derive(Debug, Parser)]
#[command(name = "vct-ts", version, about)]
struct Args {
    /// TOML config file
    #[arg(long, env = "VCT_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(long, env = "VCT_BIND")]
    bind: Option<String>,

    /// Parent directory for per-request temporary files
    #[arg(long, env = "VCT_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), "VCT_CONFIG");
    let overrides = ConfigOverrides {
        bind: args.bind,
        work_dir: args.work_dir,
        log_level: args.log_level,
    };

    // Log level comes from the config file, so read it before tracing is up
    let (mut config, config_source): (ServiceConfig, _) = load_toml(config_path.as_deref())?;
    config.apply_overrides(overrides);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting vct-ts v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.report();

    config.resolve_secrets();
    config.validate()?;

    let classifier: Option<Arc<dyn Classifier>> = if config.pipeline.enable_classification {
        let api_key = config.classifier.api_key.clone().unwrap_or_default();
        let client = ChatCompletionClassifier::new(config.classifier.clone(), api_key)?;
        info!(endpoint = %config.classifier.endpoint, "Classification enabled");
        Some(Arc::new(client))
    } else {
        None
    };

    let pipeline = Pipeline::new(&config, Arc::new(SystemProcessRunner), classifier)?;
    info!("Working directory: {}", pipeline.work_dir().display());

    let state = AppState::new(Arc::new(pipeline), config.server.max_upload_bytes);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    info!("Health check: http://{}/health", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vct-ts stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
