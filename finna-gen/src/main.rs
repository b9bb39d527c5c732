//! finna-gen - SQL insert generator for Finna book metadata
//!
//! Reads identifiers (ISBNs) from the input file, resolves each against the
//! Finna API and appends the rendered insert statements to the output file.
//! Skipped identifiers are written to the failed file for a retry run.

use anyhow::{Context, Result};
use clap::Parser;
use finna_common::config::load_or_default;
use finna_common::logging::init_logging;
use finna_gen::services::{FinnaClient, LookupService};
use finna_gen::{ConfigOverrides, GeneratorConfig, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for finna-gen
#[derive(Parser, Debug)]
#[command(name = "finna-gen")]
#[command(about = "Generate SQL inserts from Finna book metadata")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/finna-gen/config.toml)
    #[arg(long, env = "FINNA_GEN_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding authors.txt, publishers.txt, topics.txt and genres.txt
    /// (also read from FINNA_GEN_DATA_FOLDER)
    #[arg(long)]
    data_folder: Option<PathBuf>,

    /// Identifier list, one per line
    #[arg(short, long, env = "FINNA_GEN_INPUT")]
    input: Option<PathBuf>,

    /// Insert statement file (appended)
    #[arg(short, long, env = "FINNA_GEN_OUTPUT")]
    output: Option<PathBuf>,

    /// Retry list of skipped identifiers
    #[arg(long, env = "FINNA_GEN_FAILED")]
    failed: Option<PathBuf>,

    /// Maximum number of concurrent fetch blocks
    #[arg(short, long, env = "FINNA_GEN_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-identifier timeout in seconds
    #[arg(short, long, env = "FINNA_GEN_TIMEOUT")]
    timeout: Option<u64>,

    /// ID of the first generated book row
    #[arg(long, env = "FINNA_GEN_FIRST_BOOK_ID")]
    first_book_id: Option<u64>,

    /// Skip lookups and emit book rows with identifiers only
    #[arg(long, env = "FINNA_GEN_OFFLINE")]
    offline: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_folder: self.data_folder.clone(),
            input_file: self.input.clone(),
            insert_file: self.output.clone(),
            failed_file: self.failed.clone(),
            concurrency: self.concurrency,
            identifier_timeout_secs: self.timeout,
            first_book_id: self.first_book_id,
            offline: self.offline,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&toml_config.logging).context("Failed to initialize logging")?;

    info!("Starting finna-gen");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = GeneratorConfig::resolve(&toml_config, args.overrides())
        .context("Invalid configuration")?;

    let service: Option<Arc<dyn LookupService>> = if config.offline {
        None
    } else {
        let client: Arc<dyn LookupService> = Arc::new(
            FinnaClient::new(&config.lookup).context("Failed to build Finna client")?,
        );
        Some(client)
    };

    let summary = Pipeline::new(config)
        .run(service, shutdown_signal())
        .await
        .context("Generator run failed")?;

    if summary.cancelled {
        warn!(
            skipped = summary.skipped.len(),
            "Run was interrupted, unfinished identifiers are in the retry list"
        );
    }

    info!(
        "Wrote {} books ({} statements), skipped {} of {} identifiers",
        summary.books_written,
        summary.statements_written,
        summary.skipped.len(),
        summary.total
    );
    Ok(())
}

/// Completes on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
