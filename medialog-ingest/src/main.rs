//! Medialog ingest binary
//!
//! Command-line front end for the ingest pipeline: parses arguments,
//! resolves catalog credentials from the environment, runs the pipeline,
//! and prints the run summary.

use clap::Parser;
use medialog_ingest::config::{Credentials, PipelineConfig};
use medialog_ingest::hints::HintSet;
use medialog_ingest::sources::build_sources;
use medialog_ingest::Pipeline;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "medialog-ingest", about = "Convert a weekly media log into structured entries")]
struct Args {
    /// Input CSV file of weekly rows
    input: PathBuf,

    /// Output JSON file of resolved entries
    output: PathBuf,

    /// TOML file of manual title hints
    #[arg(long)]
    hints: Option<PathBuf>,

    /// Header of the date-range column
    #[arg(long, default_value = "DateRange")]
    date_column: String,

    /// Resolutions below this confidence are degraded
    #[arg(long, default_value_t = 0.5)]
    confidence_floor: f32,

    /// Parallel title lookups
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Cap on candidate events processed (for trial runs)
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let hints = match &args.hints {
        Some(path) => HintSet::load(path),
        None => HintSet::default(),
    };

    let credentials = Credentials::from_env();
    let sources = build_sources(&credentials);

    let config = PipelineConfig {
        confidence_floor: args.confidence_floor,
        concurrency: args.concurrency,
        date_column: args.date_column,
        limit: args.limit,
        ..PipelineConfig::default()
    };

    let pipeline = Pipeline::new(config, hints, sources);
    let stats = pipeline.run(&args.input, &args.output).await?;

    println!("{}", stats);
    Ok(())
}
