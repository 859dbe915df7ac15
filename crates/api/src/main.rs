//! Bankruptcy prediction API server.
//!
//! Loads configuration, initializes tracing, loads the trained artifacts
//! and serves the HTTP API until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use bp_api::server::{self, AppState};
use bp_core::config::AppConfig;
use bp_ml::predictor::BankruptcyPredictor;

/// Bankruptcy prediction API
#[derive(Parser, Debug)]
#[command(name = "bp-api", about = "Serve the bankruptcy prediction model over HTTP")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config)?;

    bp_core::logging::init_tracing(config.logging.json);

    let artifacts = &config.artifacts;
    tracing::info!(
        dir = ?artifacts.dir,
        addr = %config.bind_addr(),
        "starting bp-api"
    );

    let predictor = BankruptcyPredictor::load(
        &artifacts.features_path(),
        &artifacts.scaler_path(),
        &artifacts.classifier_path(),
    )
    .context("failed to load model artifacts")?;
    let state = Arc::new(AppState::new(predictor));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            return;
        }
        tracing::info!("received Ctrl-C, shutting down");
        shutdown.cancel();
    });

    server::run_server(state, &config.bind_addr(), cancel).await
}
