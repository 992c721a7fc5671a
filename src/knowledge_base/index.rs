//! Chunk, embed and store a user's document in the knowledge base

use std::sync::Arc;
use tracing::info;

use super::chunker::Chunker;
use super::embeddings::Embedder;
use super::models::ChunkRecord;
use super::vector_db::ChunkStore;
use crate::error::{Error, Result};

/// Texts per embeddings request
const EMBED_BATCH_SIZE: usize = 10;

pub struct KnowledgeBaseIndexer {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<ChunkStore>,
}

impl KnowledgeBaseIndexer {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: Arc<ChunkStore>) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Index `text` for `user_email` under `source`; returns the number of chunks stored
    pub async fn index_text(&self, user_email: &str, source: &str, text: &str) -> Result<usize> {
        let records = self.embed_chunks(user_email, source, text).await?;
        if records.is_empty() {
            return Ok(0);
        }

        self.store.init_collection().await?;
        let stored = self.store.upsert_chunks(&records).await?;

        info!(
            "Indexed {} chunks of '{}' for {} into '{}'",
            stored,
            source,
            user_email,
            self.store.collection()
        );
        Ok(stored)
    }

    async fn embed_chunks(&self, user_email: &str, source: &str, text: &str) -> Result<Vec<ChunkRecord>> {
        if user_email.trim().is_empty() {
            return Err(Error::InvalidArgument("user identity is required".into()));
        }

        let chunks = self.chunker.chunk(text);
        let mut records = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                records.push(ChunkRecord {
                    id: ChunkRecord::point_id(user_email, source, chunk.index),
                    text: chunk.text.clone(),
                    user_email: user_email.to_string(),
                    source: source.to_string(),
                    chunk_index: chunk.index,
                    embedding,
                });
            }
        }

        Ok(records)
    }
}
