//! Full-text entity search with one-hop relationship context

use async_trait::async_trait;
use neo4rs::query;
use tracing::debug;

use super::fulltext::{build_disjunction, rank_hits};
use super::models::{EntityRef, GraphSearchHit, RelatedEntity};
use super::store::GraphStore;
use crate::error::Result;
use crate::retrieval::GraphSearcher;

const FULLTEXT_QUERY: &str = "
    CALL db.index.fulltext.queryNodes($index, $query)
    YIELD node, score
    WHERE 'Entity' IN labels(node)
    WITH node, score, [(node)-[r]-(related:Entity) | {
        type: type(r),
        related: related {.name, .type}
    }] AS relationships
    WHERE size(relationships) > 0
    RETURN node {.name, .type} AS node, relationships, score
    ORDER BY score DESC
    LIMIT $limit";

/// Searches Entity names through the Neo4j full-text index
#[derive(Clone)]
pub struct KnowledgeGraphSearch {
    store: GraphStore,
    index: String,
}

impl KnowledgeGraphSearch {
    pub fn new(store: GraphStore, index: impl Into<String>) -> Self {
        Self {
            store,
            index: index.into(),
        }
    }

    /// Match entities whose name contains any query term.
    ///
    /// Only entities with at least one Entity neighbour are returned, best score first.
    pub async fn search_graph(&self, query_text: &str, limit: usize) -> Result<Vec<GraphSearchHit>> {
        let disjunction = build_disjunction(query_text)?;
        debug!("Full-text query on '{}': {}", self.index, disjunction);

        let q = query(FULLTEXT_QUERY)
            .param("index", self.index.as_str())
            .param("query", disjunction)
            .param("limit", limit as i64);

        let mut result = self.store.graph().execute(q).await?;
        let mut hits = Vec::new();

        while let Some(row) = result.next().await? {
            hits.push(GraphSearchHit {
                node: row.get::<EntityRef>("node")?,
                relationships: row.get::<Vec<RelatedEntity>>("relationships")?,
                score: row.get::<f64>("score")? as f32,
            });
        }

        Ok(rank_hits(hits, limit))
    }
}

#[async_trait]
impl GraphSearcher for KnowledgeGraphSearch {
    async fn search_graph(&self, query: &str, limit: usize) -> Result<Vec<GraphSearchHit>> {
        KnowledgeGraphSearch::search_graph(self, query, limit).await
    }
}
