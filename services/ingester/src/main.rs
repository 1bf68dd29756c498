//! Argo profile ingester service.
//!
//! Lists NetCDF profile files from an HTTP directory index or a local
//! directory, extracts measurement tables and metadata, writes them as
//! CSV/JSON (and optionally to PostgreSQL), and exports overlapping time
//! chunks for the embedding indexer.

mod chunks;
mod config;
mod ingest;
mod sources;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use argo_common::SourcedRecord;
use config::IngesterConfig;
use ingest::IngestionPipeline;
use ingestion::{process_dataset, ResolvedVariables};
use netcdf_parser::{silence_hdf5_errors, NetCdfDataset};
use storage::Catalog;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Argo profile ingester")]
struct Args {
    /// Configuration file path (environment variables are used when omitted)
    #[arg(short, long, env = "INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and process every listed file
    Ingest {
        /// Export time chunks after ingesting
        #[arg(long)]
        chunks: bool,
    },
    /// Export time chunks from previously written outputs
    Chunk {
        /// Read records from the database instead of the CSV directory
        #[arg(long)]
        from_db: bool,
    },
    /// Keep only the rows of one profile in every written CSV table
    Trim {
        #[arg(long, default_value_t = 0)]
        profile: u32,
    },
    /// Process a single local file and print its metadata
    Inspect { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args)?;
    silence_hdf5_errors();

    let config = match &args.config {
        Some(path) => IngesterConfig::from_yaml(path)?,
        None => IngesterConfig::from_env()?,
    };
    info!(source = ?config.source, "Loaded configuration");

    match args.command {
        Command::Ingest { chunks } => {
            let pipeline = IngestionPipeline::new(&config).await?;
            let summary = pipeline.run().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);

            if chunks {
                let records = match pipeline.catalog() {
                    Some(catalog) => catalog.fetch_records_ordered().await?,
                    None => pipeline.layout().load_records()?,
                };
                export(&config, records)?;
            }
        }
        Command::Chunk { from_db } => {
            let records = if from_db {
                let url = config
                    .database_url
                    .as_deref()
                    .context("--from-db requires a database url")?;
                Catalog::connect(url).await?.fetch_records_ordered().await?
            } else {
                config.output.layout().load_records()?
            };
            export(&config, records)?;
        }
        Command::Trim { profile } => {
            let tables = config.output.layout().trim_profiles(profile)?;
            info!(tables, profile, "Trim completed");
        }
        Command::Inspect { file } => inspect(&config, &file)?,
    }

    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match args.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }
    Ok(())
}

fn export(config: &IngesterConfig, records: Vec<SourcedRecord>) -> Result<()> {
    let path = config.chunks_path();
    let written = chunks::export_chunks(&records, config.window, &path)?;
    info!(chunks = written, path = %path.display(), "Chunk export completed");
    Ok(())
}

/// Run the core on one local file and print what it found.
fn inspect(config: &IngesterConfig, file: &Path) -> Result<()> {
    let dataset = NetCdfDataset::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dataset.source().to_string());

    let resolved = ResolvedVariables::resolve(&dataset, &config.aliases);
    let outcome = process_dataset(&name, &dataset, &config.aliases);

    let report = serde_json::json!({
        "dataset": outcome.dataset_id,
        "variables": {
            "temperature": resolved.temperature.name(),
            "pressure": resolved.pressure.name(),
            "salinity": resolved.salinity.name(),
            "time": resolved.time.name(),
            "latitude": resolved.latitude.name(),
            "longitude": resolved.longitude.name(),
        },
        "missing": resolved.missing_mandatory().iter().map(|f| f.as_str()).collect::<Vec<_>>(),
        "records": outcome.records().len(),
        "metadata": outcome.metadata,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
