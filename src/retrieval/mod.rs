//! Retrieval over the knowledge graph and the knowledge base

use async_trait::async_trait;

use crate::error::Result;
use crate::knowledge_base::VectorSearchHit;
use crate::knowledge_graph::GraphSearchHit;

pub mod hybrid;

pub use hybrid::{HybridResult, HybridRetriever};

/// Full-text entity search over the knowledge graph
#[async_trait]
pub trait GraphSearcher: Send + Sync {
    async fn search_graph(&self, query: &str, limit: usize) -> Result<Vec<GraphSearchHit>>;
}

/// Semantic chunk search, optionally scoped to one user
#[async_trait]
pub trait ChunkSearcher: Send + Sync {
    async fn search_chunks(
        &self,
        query: &str,
        limit: usize,
        identity: Option<&str>,
    ) -> Result<Vec<VectorSearchHit>>;
}
