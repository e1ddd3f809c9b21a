//! `newsfacet` - structured 5W1H evaluation pipeline.
//!
//! Settings come from a YAML file (`config.yaml`, falling back to
//! `config.example.yaml`); flags override the `run` section. API keys are
//! read from the environment, including a `.env` file if present.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use newsfacet_cli::{AppConfig, Pipeline, Step};
use newsfacet_runtime::HttpTransport;

#[derive(Parser)]
#[command(name = "newsfacet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Judge 5W1H news summaries with an LLM", long_about = None)]
struct Cli {
    /// Configuration file (default: config.yaml, then config.example.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset to process (BASSE or FLARES)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Step to run: preprocess, prepare, evaluate, validate or all
    #[arg(short, long)]
    step: Option<Step>,

    /// Maximum number of tasks; 0 means no limit
    #[arg(short, long)]
    limit: Option<usize>,

    /// Results file for a standalone validate step (default: newest)
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Environment tag used in results file names
    #[arg(short, long)]
    environment: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "newsfacet=info,newsfacet_cli=info,newsfacet_runtime=info,newsfacet_core=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let (mut config, source) = AppConfig::load(cli.config.as_deref(), &cwd)?;

    if let Some(dataset) = cli.dataset {
        config.run.dataset = dataset;
    }
    if let Some(limit) = cli.limit {
        config.run.limit = Some(limit);
    }
    if let Some(environment) = cli.environment {
        config.run.environment = environment;
    }
    if cli.verbose {
        config.run.verbose = true;
    }
    let step = match cli.step {
        Some(step) => step,
        None => config.run.step.parse()?,
    };

    init_tracing(config.run.verbose);
    tracing::info!(config = %source.display(), "Loaded configuration");

    let transport = Arc::new(HttpTransport::new()?);
    let pipeline = Pipeline::new(config, transport)?;
    let report = pipeline.run(step, cli.results.as_deref()).await?;

    for path in [report.documents, report.tasks, report.results, report.review]
        .into_iter()
        .flatten()
    {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
