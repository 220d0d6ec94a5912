//! CLI commands implementation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::Settings;
use crate::pipeline;
use crate::server;
use crate::storage::{self, WarehouseLoader};

#[derive(Parser)]
#[command(name = "pkk")]
#[command(about = "Inaportnet PKK vessel-call acquisition and warehouse loading")]
#[command(version)]
pub struct Cli {
    /// Config file (TOML); defaults to ./pkkacquire.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch scrape across configured ports and periods
    Scrape {
        /// Number of scrape workers, one browser session each
        #[arg(short, long)]
        workers: Option<usize>,
        /// Override the configured year list with a single year
        #[arg(long)]
        year: Option<String>,
        /// Override the configured month list (comma separated)
        #[arg(long, value_delimiter = ',')]
        months: Option<Vec<String>>,
        /// Write results to a local JSON file instead of uploading
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Scrape without uploading or writing anywhere
        #[arg(long)]
        no_upload: bool,
    },

    /// Start the HTTP trigger server
    Serve {
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scrape {
            workers,
            year,
            months,
            output,
            no_upload,
        } => scrape_command(settings, workers, year, months, output, no_upload).await,
        Commands::Serve { host, port } => server::serve(&settings, &host, port).await,
    }
}

async fn scrape_command(
    mut settings: Settings,
    workers: Option<usize>,
    year: Option<String>,
    months: Option<Vec<String>>,
    output: Option<PathBuf>,
    no_upload: bool,
) -> anyhow::Result<()> {
    if let Some(year) = year {
        settings.years = vec![year];
    }
    if let Some(months) = months {
        settings.months = months;
    }
    let workers = workers.unwrap_or(settings.workers);

    let report = pipeline::run(&settings, workers).await?;

    println!(
        "{} {} records from {} cells ({} failed)",
        style("Scrape complete:").green().bold(),
        report.records.len(),
        report.cells_processed,
        report.cells_failed
    );

    if report.records.is_empty() {
        println!("{}", style("No records scraped, nothing to upload").yellow());
        return Ok(());
    }

    if let Some(path) = output {
        let written = storage::export_json(&report.records, &path)?;
        println!("Saved to {}", written.display());
        return Ok(());
    }

    if no_upload {
        return Ok(());
    }

    let loader = WarehouseLoader::new();
    let object = storage::blob_name(&settings.blob_prefix);
    let body = storage::to_ndjson(&report.records)?;
    let uri = loader
        .upload_json(&settings.gcs_bucket, &object, body)
        .await?;
    loader
        .load_into_bigquery(
            &settings.bq_project,
            &settings.bq_dataset,
            &settings.bq_table,
            &uri,
        )
        .await?;

    println!(
        "{} {}",
        style("Uploaded and loaded:").green().bold(),
        uri
    );
    Ok(())
}
