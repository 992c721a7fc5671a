//! Diabetes knowledge graph CLI - main entry point
//!
//! Ingests the DiaKG corpus into Neo4j and serves hybrid retrieval over the
//! graph and the user knowledge base.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use diabetes_kg::commands::search::OutputFormat;
use diabetes_kg::{commands, metrics, Config};

#[derive(Parser)]
#[command(name = "diabetes_kg")]
#[command(about = "Diabetes knowledge graph ingestion and hybrid retrieval", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (defaults to ./config.yml, then ../config.yml)
    #[arg(long, env = "DIABETES_KG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR", global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every *.json DiaKG document in a directory into Neo4j
    Ingest {
        /// Corpus directory
        dir: PathBuf,

        /// Do not create or wait for the entity full-text index
        #[arg(long, default_value_t = false)]
        skip_index: bool,
    },

    /// Hybrid search over the knowledge graph and the knowledge base
    Search {
        query: String,

        /// Total results; split evenly between the two backends
        #[arg(short, long)]
        limit: Option<i64>,

        /// Restrict knowledge base hits to this user's uploads
        #[arg(short, long)]
        user: Option<String>,

        /// Output format: json | pretty
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Full-text entity search over the knowledge graph only
    GraphSearch {
        query: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Semantic search over one user's knowledge base
    KbSearch {
        query: String,

        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Chunk, embed and store a text file in a user's knowledge base
    IndexFile {
        path: PathBuf,

        #[arg(short, long)]
        user: String,
    },

    /// Show graph and knowledge base statistics
    Stats,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest { .. } => "ingest",
            Commands::Search { .. } => "search",
            Commands::GraphSearch { .. } => "graph_search",
            Commands::KbSearch { .. } => "kb_search",
            Commands::IndexFile { .. } => "index_file",
            Commands::Stats => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_directive()))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command, config).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { dir, skip_index } => {
            let report = commands::ingest::run(&config, &dir, skip_index).await?;
            commands::ingest::print_report(&report);
        }
        Commands::Search {
            query,
            limit,
            user,
            format,
        } => {
            commands::search::run_hybrid(
                config,
                &query,
                limit,
                user.as_deref(),
                OutputFormat::parse(&format),
            )
            .await?;
        }
        Commands::GraphSearch { query, limit } => {
            commands::search::run_graph(&config, &query, limit).await?;
        }
        Commands::KbSearch { query, user, limit } => {
            commands::search::run_knowledge_base(&config, &query, &user, limit).await?;
        }
        Commands::IndexFile { path, user } => {
            commands::index::run(&config, &path, &user).await?;
        }
        Commands::Stats => {
            commands::stats::run(&config).await?;
        }
    }

    Ok(())
}
