//! fta-submit - command-line front end for the FTA inference client
//!
//! Uploads one image, follows the processing queue and prints status
//! updates until the result (or a failure) arrives. Ctrl-C cancels the
//! submission and closes the event stream.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use fta_client::{JobOutcome, Mode, ResultPayload, StatusUpdate, SubmissionClient};
use fta_common::config::{ClientConfig, ConfigResolver, LoggingConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fta-submit
#[derive(Parser, Debug)]
#[command(name = "fta-submit")]
#[command(about = "Submit an image to the FTA inference service")]
#[command(version)]
struct Args {
    /// Image file to upload
    image: PathBuf,

    /// Processing mode (recommendation or creation)
    #[arg(short, long, default_value = "recommendation")]
    mode: Mode,

    /// Config file (overrides FTA_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service base URL (overrides the config file)
    #[arg(long, env = "FTA_BASE_URL")]
    base_url: Option<String>,

    /// Seconds without any server event before giving up
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("fta_client={0},fta_common={0}", logging.level).into());

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

/// Stderr subscriber used while the configuration is being resolved
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fta_common=info,fta_client=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;

    if let Some(base_url) = &args.base_url {
        config.service.base_url = base_url.clone();
    }
    if let Some(secs) = args.idle_timeout {
        config.stream.idle_timeout_secs = secs;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_outcome(outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Success(ResultPayload::Recommendation(result)) => {
            println!("{}", result.analysis);
            if result.items.is_empty() {
                println!("No data.");
            }
            for (index, item) in result.items.iter().enumerate() {
                println!();
                println!("[{}] {}", index + 1, item.image);
                println!("{}", item.caption);
            }
        }
        JobOutcome::Success(ResultPayload::Creation(result)) => {
            println!("Perfume Creation Details:");
            println!("{}", result.caption);
            for image in &result.images {
                println!("{}", image);
            }
        }
        JobOutcome::Failure(failure) => {
            eprintln!("{}", failure);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The configured subscriber depends on the config file, so resolution
    // logs through a temporary stderr subscriber.
    let config = tracing::subscriber::with_default(bootstrap_subscriber(), || load_config(&args))?;
    init_tracing(&config.logging)?;

    info!("Starting fta-submit v{}", env!("CARGO_PKG_VERSION"));
    info!("Service: {}", config.service.base_url);

    let client = SubmissionClient::new(config).context("Failed to create client")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<StatusUpdate>();
    let printer = tokio::spawn(async move {
        while let Some(update) = status_rx.recv().await {
            eprintln!("[{}] {}", update.timestamp.format("%H:%M:%S"), update.message);
        }
    });

    let result = client
        .submit_with_cancel(&args.image, args.mode, status_tx, cancel)
        .await;

    // The sink was moved into the submission; its sender is dropped by now
    printer.await.context("Status printer failed")?;

    let outcome = result.context("Submission failed")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
