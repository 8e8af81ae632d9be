//! Property price predictor binary.
//!
//! Loads configuration, initializes tracing, and either serves the HTTP API
//! or runs a one-off prediction or snapshot export.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use estate_core::config::AppConfig;
use estate_server::api::{parse_features, ErrorResponse, PredictionResponse};
use estate_server::backend;
use estate_server::server::{run_server, AppState};

/// Property price predictor
#[derive(Parser, Debug)]
#[command(name = "estate-server", about = "Linear-regression property price predictor")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Predict the price of one property described by a JSON file.
    Predict {
        /// Request body, as sent to `POST /api/linear-regression`.
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Write the configured slice's statistics and coefficient history to a
    /// JSON snapshot usable by the `snapshot` backend.
    ExportSnapshot {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config)?;

    estate_core::logging::init_tracing(config.logging.json);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Predict { input } => predict_once(config, input).await,
        Command::ExportSnapshot { output } => {
            backend::export_snapshot(&config, &output).await?;
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        addr = %config.bind_addr(),
        backend = ?config.store.backend,
        "starting estate-server"
    );

    let state = Arc::new(AppState::new(backend::build_predictor(&config)?));
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
        }
        shutdown.cancel();
    });

    run_server(state, &config.bind_addr(), cancel).await
}

async fn predict_once(config: AppConfig, input: PathBuf) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let body: Map<String, Value> = serde_json::from_str(&data)
        .with_context(|| format!("{} is not a JSON object", input.display()))?;

    let predictor = backend::build_predictor(&config)?;
    let result = match parse_features(&body) {
        Ok(raw) => predictor.predict(&raw).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(prediction) => {
            println!("{}", serde_json::to_string_pretty(&PredictionResponse::from(prediction))?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&err))?);
            Err(err.into())
        }
    }
}
