//! Diabetes knowledge graph library
//!
//! This library provides tools to:
//! - Ingest DiaKG annotated medical documents into a Neo4j property graph
//! - Search the graph by entity name through a Lucene full-text index
//! - Chunk, embed and store user uploads in a Qdrant knowledge base
//! - Combine both backends into a single hybrid retrieval result

pub mod config;
pub mod error;
pub mod knowledge_base;
pub mod knowledge_graph;
pub mod metrics;
pub mod retrieval;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use knowledge_base::{KnowledgeBaseIndexer, KnowledgeBaseSearch, VectorSearchHit};
pub use knowledge_graph::{Document, GraphSearchHit, GraphStore, Ingestor, KnowledgeGraphSearch};
pub use retrieval::{HybridResult, HybridRetriever};

// Commands build on the re-exported types above
pub mod commands;
