//! Fundgraph CLI
//!
//! Unified command-line interface for:
//! - Extracting holdings from a single factsheet PDF (`extract`)
//! - Batch-processing a directory of factsheets (`batch`)
//! - Loading a holdings interchange file into the portfolio graph (`load`)
//! - Applying graph constraints and indexes (`schema`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use fundgraph_classify::{IsinMapper, LlmCleanerConfig, LlmTableCleaner, TableCleaner};
use fundgraph_extract::{
    AzureLayoutClient, AzureLayoutConfig, FixtureLayoutProvider, LayoutProvider,
};
use fundgraph_store::{Neo4jHttpBackend, Neo4jSettings, PortfolioStore};

use fundgraph_cli::config::{AzureSettings, CleanerSettings, DataSettings, GraphSettings};
use fundgraph_cli::pipeline::{load_holdings_file, DocumentPipeline};

#[derive(Parser)]
#[command(name = "fundgraph")]
#[command(
    author,
    version,
    about = "Fundgraph: factsheet PDF ingestion into a portfolio graph"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract holdings from one factsheet PDF into a JSON interchange file.
    Extract {
        /// Input PDF
        input: PathBuf,
        /// Output holdings JSON
        #[arg(short, long, default_value = "data/processed/holdings.json")]
        out: PathBuf,
        /// Replay a saved layout-analysis JSON instead of calling the service
        #[arg(long)]
        layout_json: Option<PathBuf>,
    },

    /// Process every PDF in a directory, then optionally load the graph.
    Batch {
        /// Directory of factsheet PDFs (defaults to RAW_DATA_DIR)
        #[arg(long)]
        input_dir: Option<PathBuf>,
        /// Output holdings JSON
        #[arg(short, long, default_value = "data/processed/holdings.json")]
        out: PathBuf,
        /// Load the graph from the produced file after extraction
        #[arg(long)]
        load: bool,
        /// Snapshot year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Snapshot month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
    },

    /// Load a holdings interchange file into the portfolio graph.
    Load {
        /// Holdings JSON produced by `extract` or `batch`
        input: PathBuf,
        /// Snapshot year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Snapshot month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
    },

    /// Apply graph constraints and indexes (run once before bulk loads).
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            out,
            layout_json,
        } => cmd_extract(&input, &out, layout_json.as_deref()).await,
        Commands::Batch {
            input_dir,
            out,
            load,
            year,
            month,
        } => cmd_batch(input_dir.as_deref(), &out, load, year, month).await,
        Commands::Load { input, year, month } => cmd_load(&input, year, month).await,
        Commands::Schema => cmd_schema().await,
    }
}

// ============================================================================
// Component wiring
// ============================================================================

fn layout_provider(fixture: Option<&std::path::Path>) -> Result<Box<dyn LayoutProvider>> {
    match fixture {
        Some(path) => Ok(Box::new(FixtureLayoutProvider::from_json_file(path)?)),
        None => {
            let azure = AzureSettings::from_env()?;
            Ok(Box::new(AzureLayoutClient::new(AzureLayoutConfig::new(
                &azure.endpoint,
                &azure.key,
            ))))
        }
    }
}

fn table_cleaner() -> Result<Box<dyn TableCleaner>> {
    let settings = CleanerSettings::from_env()?;
    let mut config = LlmCleanerConfig::new(&settings.api_key, &settings.model);
    config.temperature = settings.temperature;
    if let Some(url) = &settings.base_url {
        config = config.with_base_url(url);
    }
    Ok(Box::new(LlmTableCleaner::new(config)))
}

fn portfolio_store() -> Result<PortfolioStore> {
    let graph = GraphSettings::from_env()?;
    let settings = Neo4jSettings::new(&graph.http_url, &graph.username, &graph.password)
        .with_database(&graph.database);
    Ok(PortfolioStore::new(Arc::new(Neo4jHttpBackend::new(
        settings,
    ))))
}

fn snapshot_period(year: Option<i32>, month: Option<u32>) -> (i32, u32) {
    use chrono::Datelike;
    let now = chrono::Utc::now();
    (year.unwrap_or_else(|| now.year()), month.unwrap_or_else(|| now.month()))
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_extract(
    input: &std::path::Path,
    out: &std::path::Path,
    layout_json: Option<&std::path::Path>,
) -> Result<()> {
    let data = DataSettings::from_env()?;
    let mut pipeline = DocumentPipeline::new(
        layout_provider(layout_json)?,
        table_cleaner()?,
        IsinMapper::from_csv_path(&data.isin_mapping_path),
    );

    println!(
        "{} {}",
        "Extracting".green().bold(),
        input.display().to_string().bold()
    );
    let records = pipeline.process_document(input).await?;
    pipeline.save(out)?;

    println!(
        "{} {} holdings {} {}",
        "ok".green().bold(),
        records,
        "→".cyan(),
        out.display()
    );
    Ok(())
}

async fn cmd_batch(
    input_dir: Option<&std::path::Path>,
    out: &std::path::Path,
    load: bool,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    let data = DataSettings::from_env()?;
    let dir = input_dir.unwrap_or(&data.raw_data_dir);

    let mut pipeline = DocumentPipeline::new(
        layout_provider(None)?,
        table_cleaner()?,
        IsinMapper::from_csv_path(&data.isin_mapping_path),
    );

    println!(
        "{} {}",
        "Processing".green().bold(),
        dir.display().to_string().bold()
    );
    let outcome = pipeline.process_directory(dir).await?;
    let records = pipeline.records().len();
    pipeline.save(out)?;

    println!(
        "{} {} documents processed, {} failed, {} holdings {} {}",
        "ok".green().bold(),
        outcome.processed,
        outcome.failed,
        records,
        "→".cyan(),
        out.display()
    );

    if load {
        cmd_load(out, year, month).await?;
    }
    Ok(())
}

async fn cmd_load(input: &std::path::Path, year: Option<i32>, month: Option<u32>) -> Result<()> {
    let (year, month) = snapshot_period(year, month);
    let store = portfolio_store()?;

    println!(
        "{} {} ({}-{:02})",
        "Loading".green().bold(),
        input.display().to_string().bold(),
        year,
        month
    );

    let result = load_holdings_file(&store, input, year, month).await;
    store.close().await?;
    let (loaded, failed) = result?;

    println!(
        "{} {} funds loaded, {} failed",
        "ok".green().bold(),
        loaded,
        failed
    );
    Ok(())
}

async fn cmd_schema() -> Result<()> {
    let store = portfolio_store()?;

    let result = store.apply_schema().await;
    store.close().await?;
    result?;

    println!("{} constraints and indexes applied", "ok".green().bold());
    Ok(())
}
