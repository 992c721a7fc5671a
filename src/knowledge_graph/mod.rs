//! Medical knowledge graph in Neo4j
//!
//! Provides tools for:
//! - Loading annotated DiaKG-style documents as a property graph
//! - Managing the Entity name full-text index
//! - Full-text entity search with relationship context

pub mod fulltext;
pub mod ingest;
pub mod models;
pub mod relation_type;
pub mod search;
pub mod store;

pub use ingest::{CorpusReport, IngestReport, Ingestor};
pub use models::{Document, EntityRef, GraphSearchHit, GraphStats, RelatedEntity};
pub use relation_type::RelationType;
pub use search::KnowledgeGraphSearch;
pub use store::GraphStore;
