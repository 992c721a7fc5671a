//! Load a DiaKG corpus directory into Neo4j

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::{connect_graph, ingestor};
use crate::config::Config;
use crate::knowledge_graph::CorpusReport;

pub async fn run(config: &Config, dir: &Path, skip_index: bool) -> Result<CorpusReport> {
    if !dir.is_dir() {
        anyhow::bail!("corpus directory not found: {}", dir.display());
    }

    let graph = connect_graph(config).await?;
    graph
        .init_schema()
        .await
        .context("failed to create uniqueness constraints")?;

    let report = ingestor(config, graph)
        .ingest_corpus(dir, !skip_index)
        .await
        .with_context(|| format!("failed to ingest corpus from {}", dir.display()))?;

    info!(
        "Ingested {} documents: {} paragraphs, {} sentences, {} entities, {} relations",
        report.documents_ingested,
        report.totals.paragraphs,
        report.totals.sentences,
        report.totals.entities,
        report.totals.relations
    );
    for failed in &report.documents_failed {
        warn!("Skipped {}", failed.display());
    }

    Ok(report)
}

pub fn print_report(report: &CorpusReport) {
    println!("Documents ingested: {}", report.documents_ingested);
    println!("Documents failed:   {}", report.documents_failed.len());
    println!("Paragraphs:         {}", report.totals.paragraphs);
    println!("Sentences:          {}", report.totals.sentences);
    println!("Entities:           {}", report.totals.entities);
    println!("Relations:          {}", report.totals.relations);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_fails_before_connecting() {
        let config = Config::new();
        let err = run(&config, Path::new("/nonexistent/diakg"), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("corpus directory not found"));
    }
}
