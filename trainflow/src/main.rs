//! Trainflow CLI - ingest, train and publish object-detection models

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use trainflow::observability::{init_tracing, LogFormat};
use trainflow::prelude::*;
use trainflow::utils::run_directory_name;

#[derive(Parser)]
#[command(name = "trainflow")]
#[command(author, version, about = "Ingest, train and publish object-detection models", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run ingestion, training and publishing once
    Run {
        #[command(flatten)]
        source: ConfigArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Training engine executable
        #[arg(long, default_value = "yolo")]
        engine_program: PathBuf,
        /// Extra argument appended to the engine command line (repeatable)
        #[arg(long = "engine-arg")]
        engine_args: Vec<String>,
    },
    /// Download the published model unless it is already present
    FetchModel {
        #[command(flatten)]
        source: ConfigArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Local model path
        #[arg(long)]
        dest: PathBuf,
    },
    /// Print the effective configuration
    ShowConfig {
        #[command(flatten)]
        source: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Pipeline config file (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Artifact root used when no config file is given
    #[arg(long, default_value = "artifacts")]
    root: PathBuf,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct StoreArgs {
    /// Directory backing a filesystem object store
    #[arg(long)]
    store_root: Option<PathBuf>,
    /// Base URL of an HTTP object store
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            source,
            store,
            engine_program,
            engine_args,
        } => {
            let config = load_config(&source)?;
            config.validate()?;
            let storage = open_store(&store)?;
            let engine = engine_args
                .into_iter()
                .fold(CommandTrainingEngine::new(engine_program), |engine, arg| {
                    engine.with_arg(arg)
                });

            let token = CancellationToken::new();
            let on_signal = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current stage");
                    on_signal.cancel("interrupted");
                }
            });

            let pipeline = TrainingPipeline::new(config, storage, Arc::new(engine))
                .with_event_sink(Arc::new(LoggingEventSink::default()))
                .with_cancellation(token);
            let report = pipeline.run().await?;
            println!("{}", report.to_json()?);
        }
        Commands::FetchModel {
            source,
            store,
            dest,
        } => {
            let config = load_config(&source)?;
            let storage = open_store(&store)?;
            let path = fetch_model(&config.publish, storage.as_ref(), &dest).await?;
            info!(path = %path.display(), "Model ready");
            println!("{}", path.display());
        }
        Commands::ShowConfig { source } => {
            let config = load_config(&source)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => {
            let root = std::path::absolute(&args.root)
                .with_context(|| format!("Failed to resolve {}", args.root.display()))?;
            PipelineConfig::under_root(root.join(run_directory_name(Utc::now())))
        }
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn open_store(args: &StoreArgs) -> Result<Arc<dyn StorageClient>> {
    if let Some(root) = &args.store_root {
        return open_fs_store(root);
    }
    match &args.endpoint {
        Some(endpoint) => open_http_store(endpoint),
        None => bail!("Either --store-root or --endpoint is required"),
    }
}

fn open_fs_store(root: &Path) -> Result<Arc<dyn StorageClient>> {
    let store = FsObjectStore::new(root)
        .with_context(|| format!("Failed to open object store at {}", root.display()))?;
    Ok(Arc::new(store))
}

#[cfg(feature = "http")]
fn open_http_store(endpoint: &str) -> Result<Arc<dyn StorageClient>> {
    let store = HttpObjectStore::new(endpoint).context("Failed to build HTTP client")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "http"))]
fn open_http_store(endpoint: &str) -> Result<Arc<dyn StorageClient>> {
    bail!("Cannot use {endpoint}: built without the http feature")
}
