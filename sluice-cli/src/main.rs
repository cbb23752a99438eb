use clap::{Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use sluice::{
    core::{
        ingest::run_ingest,
        load::run_load,
        report::StageReport,
        tasks::TaskRunner,
        transform::run_transform,
        warehouse::Warehouse,
    },
    schemas::WarehouseConfig,
    storage::Bucket,
    Error, LoggingProgressTracker,
};
use std::{error::Error as StdError, fmt, str::FromStr, sync::Arc};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

mod config;

use config::{IngestArgs, LoadArgs, RunnerArgs, TransformArgs};

/// Move CSV files through an object store into a SQL warehouse
#[derive(Debug, Parser)]
#[command(name = "sluice", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "SLUICE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, env = "SLUICE_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Format of the run summary printed to stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(flatten)]
    runner: RunnerArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload the CSV files of a local directory to the object store
    Ingest(IngestArgs),

    /// Load every CSV object under the prefix into its own warehouse table
    Load(LoadArgs),

    /// Run the silver, data quality and gold SQL scripts against the warehouse
    Transform(TransformArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // before parsing, so clap's env fallbacks see the values from .env
    let env_file = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    let runner = TaskRunner::new(&cli.runner.runner_config().map_err(Error::from)?)
        .with_progress_tracker(Arc::new(LoggingProgressTracker));

    match cli.command {
        Commands::Ingest(args) => {
            let config = args.ingest_config().map_err(Error::from)?;
            let bucket = Bucket::connect(&args.store.object_store_config().map_err(Error::from)?)
                .map_err(Error::from)?;

            info!(
                "Ingesting {} into bucket {}",
                config.source_dir.display(),
                bucket.name()
            );
            let report = run_ingest(&config, &bucket, &runner)
                .await
                .map_err(Error::from)?;
            finish(report, cli.output)
        }
        Commands::Load(args) => {
            let config = args.load_config().map_err(Error::from)?;
            let bucket = Bucket::connect(&args.store.object_store_config().map_err(Error::from)?)
                .map_err(Error::from)?;
            let warehouse =
                connect_warehouse(args.warehouse.warehouse_config().map_err(Error::from)?)?;

            let report = run_load(&config, &bucket, warehouse.as_ref(), &runner)
                .await
                .map_err(Error::from)?;
            finish(report, cli.output)
        }
        Commands::Transform(args) => {
            let config = args.transform_config().map_err(Error::from)?;
            let warehouse =
                connect_warehouse(args.warehouse.warehouse_config().map_err(Error::from)?)?;

            info!("Transforming with scripts from {}", config.sql_dir.display());
            let report = run_transform(&config, warehouse.as_ref(), &runner)
                .await
                .map_err(Error::from)?;
            finish(report, cli.output)
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let log_level = Level::from_str(log_level.to_lowercase().as_str()).unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env().add_directive(log_level.into());
    let registry = tracing_subscriber::registry().with(filter);

    // logs go to stderr, stdout only carries the run summary
    match format {
        LogFormat::Text => registry
            .with(
                log_fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                log_fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .init(),
    }
}

#[cfg(feature = "odbc")]
fn connect_warehouse(config: WarehouseConfig) -> Result<Box<dyn Warehouse>, Error> {
    Ok(Box::new(sluice::warehouse::OdbcWarehouse::new(config)))
}

#[cfg(not(feature = "odbc"))]
fn connect_warehouse(config: WarehouseConfig) -> Result<Box<dyn Warehouse>, Error> {
    Err(Error::Unsupported(format!(
        "The ODBC warehouse at {} (rebuild with the 'odbc' feature)",
        config.redacted_url()
    )))
}

/// Print the run summary and fail when any unit failed or was skipped
fn finish<T, E>(report: StageReport<T, E>, output: OutputFormat) -> miette::Result<()>
where
    T: fmt::Display,
    E: StdError,
{
    let summary = report.summary();

    match output {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?)
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(Error::StageFailed {
            stage: report.stage,
            failed: report.failed() + report.skipped.len(),
        }
        .into())
    }
}
