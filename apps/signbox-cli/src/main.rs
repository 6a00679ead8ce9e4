use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use signbox_client::config::SignboxConfig;
use signbox_client::model::{SignatureFormat, SignatureLevel, SigningOutcome};
use tracing_subscriber::prelude::*;

const EXIT_SETUP_ERROR: u8 = 1;
const EXIT_PERMANENT_FAILURE: u8 = 2;
const EXIT_RETRYABLE_FAILURE: u8 = 3;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Pades,
    Xades,
    Cades,
}

impl From<Format> for SignatureFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Pades => SignatureFormat::Pades,
            Format::Xades => SignatureFormat::Xades,
            Format::Cades => SignatureFormat::Cades,
        }
    }
}

/// Sign a document with the remote signing service.
///
/// Exits with 0 when signed, 2 on a permanent failure, 3 when the call may be retried
/// later and 1 when the setup failed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration files (YAML or JSON), later files override earlier ones
    #[arg(short, long, value_name = "FILE")]
    config: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value = "pades")]
    format: Format,

    /// Request a timestamped signature (level `T` instead of `BES`)
    #[arg(short, long)]
    timestamp: bool,

    /// Log level used when `RUST_LOG` is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long)]
    log_json: bool,

    input: PathBuf,
    output: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.log_json);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("Failed to start runtime: {error}");
            return ExitCode::from(EXIT_SETUP_ERROR);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = SignboxConfig::from_files(&cli.config).context("Failed creating config")?;
    let service = signbox_client::initialize(config).context("Failed initializing client")?;

    let document = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed reading {}", cli.input.display()))?;

    let outcome = service
        .sign_document(
            document,
            cli.format.into(),
            SignatureLevel::from_timestamping(cli.timestamp),
        )
        .await;

    match outcome {
        SigningOutcome::Signed { document, .. } => {
            tokio::fs::write(&cli.output, &document)
                .await
                .with_context(|| format!("Failed writing {}", cli.output.display()))?;
            tracing::info!(
                "Signed document written to {} ({} bytes)",
                cli.output.display(),
                document.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        SigningOutcome::RetryableFailure { reason, .. } => {
            tracing::warn!("Signing failed, try again later: {reason}");
            Ok(ExitCode::from(EXIT_RETRYABLE_FAILURE))
        }
        SigningOutcome::PermanentFailure { reason, .. } => {
            tracing::error!("Signing failed permanently: {reason}");
            Ok(ExitCode::from(EXIT_PERMANENT_FAILURE))
        }
    }
}

fn initialize_tracing(log_level: &str, json: bool) {
    // Create a filter based on the log level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let tracing_layer = tracing_subscriber::registry().with(filter);

    if json {
        tracing_layer
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_layer.with(tracing_subscriber::fmt::layer()).init();
    };
}
