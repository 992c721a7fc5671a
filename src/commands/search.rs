//! Hybrid, graph-only and knowledge-base-only search commands

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{connect_graph, graph_search, KnowledgeBase, Services};
use crate::config::Config;
use crate::knowledge_base::VectorSearchHit;
use crate::knowledge_graph::GraphSearchHit;
use crate::retrieval::HybridResult;

/// Result rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "pretty" | "text" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Token cancelled on Ctrl-C or once `timeout` elapses
pub fn cancel_on_interrupt(timeout: Duration) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling search");
            on_signal.cancel();
        }
    });

    let on_timeout = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = on_timeout.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                warn!("Search exceeded {:?}, cancelling", timeout);
                on_timeout.cancel();
            }
        }
    });

    token
}

pub async fn run_hybrid(
    config: Config,
    query: &str,
    limit: Option<i64>,
    user: Option<&str>,
    format: OutputFormat,
) -> Result<HybridResult> {
    let timeout = Duration::from_secs(config.search.timeout_secs);
    let services = Services::connect(config).await?;
    let cancel = cancel_on_interrupt(timeout);

    let result = services
        .retriever()
        .search(query, limit.unwrap_or(0), user, &cancel)
        .await
        .context("hybrid search failed")?;
    cancel.cancel();

    info!(
        "Hybrid search: {} graph hits, {} chunk hits",
        result.graph_hits.len(),
        result.vector_hits.len()
    );
    println!("{}", render_hybrid(&result, format)?);
    Ok(result)
}

pub async fn run_graph(config: &Config, query: &str, limit: usize) -> Result<Vec<GraphSearchHit>> {
    let graph = connect_graph(config).await?;
    let hits = graph_search(config, graph)
        .search_graph(query, limit)
        .await
        .context("graph search failed")?;

    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(hits)
}

pub async fn run_knowledge_base(
    config: &Config,
    query: &str,
    user: &str,
    limit: usize,
) -> Result<Vec<VectorSearchHit>> {
    let hits = KnowledgeBase::connect(config)?
        .search()
        .search_chunks(query, limit, Some(user))
        .await
        .context("knowledge base search failed")?;

    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(hits)
}

pub fn render_hybrid(result: &HybridResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Pretty => Ok(render_pretty(result)),
    }
}

fn render_pretty(result: &HybridResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Knowledge graph ({} hits)", result.graph_hits.len());
    for hit in &result.graph_hits {
        let _ = writeln!(
            out,
            "  [{:.3}] {} ({})",
            hit.score,
            hit.node.name.as_deref().unwrap_or("?"),
            hit.node.entity_type.as_deref().unwrap_or("?")
        );
        for rel in &hit.relationships {
            let _ = writeln!(
                out,
                "      -{}- {} ({})",
                rel.relation_type,
                rel.related.name.as_deref().unwrap_or("?"),
                rel.related.entity_type.as_deref().unwrap_or("?")
            );
        }
    }

    let _ = writeln!(out, "Knowledge base ({} hits)", result.vector_hits.len());
    for hit in &result.vector_hits {
        let _ = writeln!(out, "  [{:.3}] {}", hit.score, hit.chunk);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_graph::{EntityRef, RelatedEntity};

    fn sample() -> HybridResult {
        HybridResult {
            graph_hits: vec![GraphSearchHit {
                node: EntityRef {
                    name: Some("二甲双胍".into()),
                    entity_type: Some("Drug".into()),
                },
                relationships: vec![RelatedEntity {
                    relation_type: "Drug_Disease".into(),
                    related: EntityRef {
                        name: Some("2型糖尿病".into()),
                        entity_type: Some("Disease".into()),
                    },
                }],
                score: 1.5,
            }],
            vector_hits: vec![VectorSearchHit {
                chunk: "HbA1c target below 7%".into(),
                score: 0.8,
            }],
        }
    }

    #[test]
    fn format_parsing_defaults_to_json() {
        assert_eq!(OutputFormat::parse("pretty"), OutputFormat::Pretty);
        assert_eq!(OutputFormat::parse("PRETTY"), OutputFormat::Pretty);
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Json);
    }

    #[test]
    fn json_output_uses_backend_keys() {
        let json = render_hybrid(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value["knowledge_graph_results"][0]["relationships"][0]["type"],
            "Drug_Disease"
        );
        assert_eq!(value["vector_store_results"][0]["chunk"], "HbA1c target below 7%");
    }

    #[test]
    fn pretty_output_lists_both_sections() {
        let text = render_hybrid(&sample(), OutputFormat::Pretty).unwrap();

        assert!(text.contains("Knowledge graph (1 hits)"));
        assert!(text.contains("-Drug_Disease- 2型糖尿病 (Disease)"));
        assert!(text.contains("[0.800] HbA1c target below 7%"));
    }

    #[tokio::test]
    async fn hybrid_command_survives_unreachable_graph() {
        let mut config = Config::new();
        config.neo4j.uri = "127.0.0.1:1".into();
        config.qdrant.url = "http://127.0.0.1:1".into();
        config.embedding.api_key = "sk-test".into();
        config.embedding.base_url = "http://127.0.0.1:1/v1".into();
        config.embedding.timeout_secs = 2;

        let result = run_hybrid(config, "metformin", Some(10), None, OutputFormat::Json)
            .await
            .unwrap();

        assert!(result.graph_hits.is_empty());
    }

    #[tokio::test]
    async fn timeout_cancels_token() {
        let token = cancel_on_interrupt(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(2), token.cancelled())
            .await
            .expect("token should be cancelled by the timeout");
    }
}
