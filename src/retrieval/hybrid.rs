//! Hybrid retrieval: graph full-text hits plus vector chunk hits under one limit

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{ChunkSearcher, GraphSearcher};
use crate::config::DEFAULT_SEARCH_LIMIT;
use crate::error::{Error, Result};
use crate::knowledge_base::VectorSearchHit;
use crate::knowledge_graph::GraphSearchHit;
use crate::metrics;

const GRAPH_BACKEND: &str = "knowledge_graph";
const VECTOR_BACKEND: &str = "vector_store";

/// Both sub-lists as returned by their backends; never re-ranked across backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HybridResult {
    #[serde(rename = "knowledge_graph_results")]
    pub graph_hits: Vec<GraphSearchHit>,
    #[serde(rename = "vector_store_results")]
    pub vector_hits: Vec<VectorSearchHit>,
}

impl HybridResult {
    pub fn is_empty(&self) -> bool {
        self.graph_hits.is_empty() && self.vector_hits.is_empty()
    }
}

#[derive(Clone)]
pub struct HybridRetriever {
    graph: Arc<dyn GraphSearcher>,
    chunks: Arc<dyn ChunkSearcher>,
    default_limit: i64,
}

impl HybridRetriever {
    pub fn new(graph: Arc<dyn GraphSearcher>, chunks: Arc<dyn ChunkSearcher>) -> Self {
        Self {
            graph,
            chunks,
            default_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, default_limit: i64) -> Self {
        if default_limit > 0 {
            self.default_limit = default_limit;
        }
        self
    }

    /// Run both sub-searches concurrently.
    ///
    /// A failing backend contributes an empty list; only an empty query or
    /// cancellation fails the whole call.
    pub async fn search(
        &self,
        query: &str,
        limit: i64,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<HybridResult> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let budget = per_backend_limit(limit, self.default_limit);
        debug!("Hybrid search per-backend limit={}", budget);

        let graph = async {
            if budget == 0 {
                return Ok(Vec::new());
            }
            self.graph.search_graph(query, budget).await
        };
        let vectors = async {
            if budget == 0 {
                return Ok(Vec::new());
            }
            self.chunks.search_chunks(query, budget, identity).await
        };

        let (graph, vectors) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Hybrid search cancelled");
                return Err(Error::Cancelled);
            }
            joined = async { tokio::join!(graph, vectors) } => joined,
        };

        Ok(HybridResult {
            graph_hits: settle(GRAPH_BACKEND, graph),
            vector_hits: settle(VECTOR_BACKEND, vectors),
        })
    }
}

/// Each backend gets half of the effective limit; `limit <= 0` means the default
pub fn per_backend_limit(limit: i64, default_limit: i64) -> usize {
    let effective = if limit > 0 { limit } else { default_limit };
    (effective.max(0) / 2) as usize
}

fn settle<T>(backend: &'static str, outcome: Result<Vec<T>>) -> Vec<T> {
    match outcome {
        Ok(hits) => {
            metrics::record_subsearch(backend, true);
            hits
        }
        Err(err) => {
            error!(backend, "Sub-search failed: {}", err);
            metrics::record_subsearch(backend, false);
            Vec::new()
        }
    }
}
