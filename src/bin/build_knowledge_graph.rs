//! Standalone loader: ingest a DiaKG corpus directory into Neo4j

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use diabetes_kg::commands::ingest::{print_report, run};
use diabetes_kg::Config;

#[derive(Parser)]
#[command(name = "build_knowledge_graph")]
#[command(about = "Build the diabetes knowledge graph from DiaKG JSON files")]
struct Cli {
    /// Corpus directory with one JSON document per file
    #[arg(default_value = "resource/diakg")]
    dir: PathBuf,

    /// Path to config.yml
    #[arg(long, env = "DIABETES_KG_CONFIG")]
    config: Option<PathBuf>,

    /// Do not create or wait for the entity full-text index
    #[arg(long)]
    skip_index: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("diabetes_kg=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let report = run(&config, &cli.dir, cli.skip_index).await?;

    println!("\n=== Knowledge Graph Build ===\n");
    print_report(&report);

    if report.documents_ingested == 0 && !report.documents_failed.is_empty() {
        anyhow::bail!("no documents could be ingested from {}", cli.dir.display());
    }
    Ok(())
}
