//! Terminal front end: walks the learning path one checkpoint at a time,
//! reading answers from stdin. Logs go to stderr so they don't interleave
//! with the quiz.

use anyhow::Context;
use clap::Parser;
use mastery_api::{
    bootstrap::{build_tutor, load_catalog},
    config::Config,
    terminal::{TerminalLearner, render_summary},
};
use mastery_core::LearningPath;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "tutor", about = "Work through a mastery learning path in the terminal")]
#[command(version)]
struct Cli {
    /// JSON catalog of checkpoints (overrides CATALOG_PATH)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Zero-based checkpoint to start from
    #[arg(long, default_value_t = 0)]
    start_at: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let tutor = build_tutor(&config).context("Failed to build tutor")?;
    let catalog_path = cli.catalog.or_else(|| config.catalog_path.clone());
    let catalog = load_catalog(catalog_path.as_deref())?;
    let mut path = LearningPath::start_at(catalog, cli.start_at);

    let (completed, total) = path.progress();
    info!(completed, total, "Starting learning path");

    let learner = TerminalLearner::new();
    let report = tutor.run_path(&mut path, &learner).await?;

    println!("{}", render_summary(&report));
    Ok(())
}
