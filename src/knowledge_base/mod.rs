//! User knowledge base: chunked uploads embedded into Qdrant
//!
//! - `chunker` splits uploaded text into overlapping windows
//! - `embeddings` calls an OpenAI-compatible embeddings endpoint
//! - `vector_db` stores and searches chunk vectors
//! - `index` and `search` tie these together per user identity

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod models;
pub mod search;
pub mod vector_db;

pub use chunker::{Chunk, Chunker, ChunkingStrategy};
pub use embeddings::{Embedder, EmbeddingService};
pub use index::KnowledgeBaseIndexer;
pub use models::{ChunkRecord, VectorSearchHit};
pub use search::KnowledgeBaseSearch;
pub use vector_db::{ChunkFilter, ChunkStore, CollectionStats, VectorIndex};
