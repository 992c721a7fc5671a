//! Knowledge base chunk records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Retrieved chunk text and its similarity score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorSearchHit {
    pub chunk: String,
    pub score: f32,
}

/// A chunk of a user's uploaded document, ready for upsert
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: Uuid,
    pub text: String,
    /// Owner identity used by the search filter
    pub user_email: String,
    /// Upload name (file name or label)
    pub source: String,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    /// Point ids are derived from owner, source and position so re-indexing
    /// the same file overwrites its previous chunks.
    pub fn point_id(user_email: &str, source: &str, chunk_index: usize) -> Uuid {
        let name = format!("{}/{}/{}", user_email, source, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
    }
}
