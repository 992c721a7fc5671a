//! Command implementations
//!
//! Each module corresponds to a subcommand of the `diabetes_kg` CLI.
//! Shared backend clients are built once here and handed to the commands.

pub mod index;
pub mod ingest;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::knowledge_base::{
    Chunker, ChunkStore, Embedder, EmbeddingService, KnowledgeBaseIndexer, KnowledgeBaseSearch,
    VectorSearchHit,
};
use crate::knowledge_graph::{GraphSearchHit, GraphStore, Ingestor, KnowledgeGraphSearch};
use crate::retrieval::{ChunkSearcher, GraphSearcher, HybridRetriever};

/// Bound on the initial Neo4j handshake
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open the Neo4j pool and verify it answers
pub async fn connect_graph(config: &Config) -> Result<GraphStore> {
    GraphStore::connect(&config.neo4j, CONNECT_TIMEOUT)
        .await
        .with_context(|| format!("failed to connect to Neo4j at {}", config.neo4j.uri))
}

/// Embedding client plus the chunk collection
#[derive(Clone)]
pub struct KnowledgeBase {
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<ChunkStore>,
}

impl KnowledgeBase {
    pub fn connect(config: &Config) -> Result<Self> {
        let embedder =
            EmbeddingService::new(&config.embedding).context("failed to build embedding client")?;
        let store = ChunkStore::new(
            &config.qdrant.url,
            config.qdrant.collection.clone(),
            config.embedding.dimension,
        )
        .with_context(|| format!("failed to connect to Qdrant at {}", config.qdrant.url))?;

        Ok(Self {
            embedder: Arc::new(embedder),
            store: Arc::new(store),
        })
    }

    pub fn search(&self) -> KnowledgeBaseSearch {
        KnowledgeBaseSearch::new(self.embedder.clone(), self.store.clone())
    }

    pub fn indexer(&self, config: &Config) -> KnowledgeBaseIndexer {
        let chunker = Chunker::with_strategy(
            config.chunking.size,
            config.chunking.overlap,
            config.chunking.strategy,
        );
        KnowledgeBaseIndexer::new(chunker, self.embedder.clone(), self.store.clone())
    }
}

/// Stand-in for a backend whose client could not be built.
///
/// Every search returns the setup error, so hybrid retrieval logs it and
/// serves the other backend alone.
#[derive(Debug, Clone)]
pub struct Unavailable {
    backend: &'static str,
    reason: String,
}

impl Unavailable {
    pub fn new(backend: &'static str, err: &anyhow::Error) -> Self {
        Self {
            backend,
            reason: format!("{:#}", err),
        }
    }

    fn error(&self) -> Error {
        Error::ConnectionError(format!("{} unavailable: {}", self.backend, self.reason))
    }
}

#[async_trait]
impl GraphSearcher for Unavailable {
    async fn search_graph(&self, _query: &str, _limit: usize) -> crate::Result<Vec<GraphSearchHit>> {
        Err(self.error())
    }
}

#[async_trait]
impl ChunkSearcher for Unavailable {
    async fn search_chunks(
        &self,
        _query: &str,
        _limit: usize,
        _identity: Option<&str>,
    ) -> crate::Result<Vec<VectorSearchHit>> {
        Err(self.error())
    }
}

/// Composition root for hybrid search.
///
/// Each backend is built on its own; one that cannot be reached is replaced by
/// [`Unavailable`]. Only when neither backend can be built does `connect` fail.
pub struct Services {
    pub config: Config,
    pub graph: Arc<dyn GraphSearcher>,
    pub chunks: Arc<dyn ChunkSearcher>,
}

impl Services {
    pub async fn connect(config: Config) -> Result<Self> {
        let graph: Result<Arc<dyn GraphSearcher>> = connect_graph(&config)
            .await
            .map(|store| Arc::new(graph_search(&config, store)) as Arc<dyn GraphSearcher>);
        let chunks: Result<Arc<dyn ChunkSearcher>> = KnowledgeBase::connect(&config)
            .map(|kb| Arc::new(kb.search()) as Arc<dyn ChunkSearcher>);

        let (graph, chunks) = match (graph, chunks) {
            (Err(graph_err), Err(chunks_err)) => {
                anyhow::bail!(
                    "no search backend available: {:#}; {:#}",
                    graph_err,
                    chunks_err
                );
            }
            (graph, chunks) => (
                graph.unwrap_or_else(|err| {
                    warn!("Knowledge graph unavailable, searching knowledge base only: {:#}", err);
                    Arc::new(Unavailable::new("knowledge graph", &err)) as Arc<dyn GraphSearcher>
                }),
                chunks.unwrap_or_else(|err| {
                    warn!("Knowledge base unavailable, searching knowledge graph only: {:#}", err);
                    Arc::new(Unavailable::new("knowledge base", &err)) as Arc<dyn ChunkSearcher>
                }),
            ),
        };

        Ok(Self {
            config,
            graph,
            chunks,
        })
    }

    pub fn retriever(&self) -> HybridRetriever {
        HybridRetriever::new(self.graph.clone(), self.chunks.clone())
            .with_default_limit(self.config.search.default_limit)
    }
}

pub fn graph_search(config: &Config, graph: GraphStore) -> KnowledgeGraphSearch {
    KnowledgeGraphSearch::new(graph, config.search.fulltext_index.clone())
}

pub fn ingestor(config: &Config, graph: GraphStore) -> Ingestor {
    Ingestor::new(
        graph,
        config.search.fulltext_index.clone(),
        Duration::from_secs(config.search.index_timeout_secs),
    )
}
