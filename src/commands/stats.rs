//! Node and edge counts for the graph plus the chunk collection size

use anyhow::{Context, Result};
use tracing::warn;

use super::{connect_graph, KnowledgeBase};
use crate::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let graph = connect_graph(config).await?;
    let stats = graph.stats().await.context("failed to read graph statistics")?;

    println!("Knowledge graph");
    println!("  Documents:  {}", stats.document_count);
    println!("  Paragraphs: {}", stats.paragraph_count);
    println!("  Sentences:  {}", stats.sentence_count);
    println!("  Entities:   {}", stats.entity_count);
    println!("  Relations:  {}", stats.relation_count);

    // The knowledge base is optional for graph-only deployments
    let collection = match KnowledgeBase::connect(config) {
        Ok(kb) => kb.store.stats().await.map_err(anyhow::Error::from),
        Err(err) => Err(err),
    };
    match collection {
        Ok(info) => {
            println!("Knowledge base '{}'", config.qdrant.collection);
            println!("  Chunks:    {}", info.points_count);
            println!("  Dimension: {}", info.dimension);
        }
        Err(err) => warn!("Knowledge base unavailable: {:#}", err),
    }

    Ok(())
}
