//! Semantic search over a user's uploaded knowledge base

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::embeddings::Embedder;
use super::models::VectorSearchHit;
use super::vector_db::{ChunkFilter, VectorIndex};
use crate::error::{Error, Result};
use crate::retrieval::ChunkSearcher;

/// Embeds the query and runs a kNN search, scoped to the caller when an identity is given
#[derive(Clone)]
pub struct KnowledgeBaseSearch {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeBaseSearch {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn search_chunks(
        &self,
        query: &str,
        limit: usize,
        identity: Option<&str>,
    ) -> Result<Vec<VectorSearchHit>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let vector = self.embedder.embed_query(query).await?;

        let filter = identity
            .filter(|id| !id.trim().is_empty())
            .map(|id| ChunkFilter::new().user(id));
        debug!(
            "Vector search limit={} scoped={}",
            limit,
            filter.is_some()
        );

        self.index.search(vector, limit as u64, filter).await
    }
}

#[async_trait]
impl ChunkSearcher for KnowledgeBaseSearch {
    async fn search_chunks(
        &self,
        query: &str,
        limit: usize,
        identity: Option<&str>,
    ) -> Result<Vec<VectorSearchHit>> {
        KnowledgeBaseSearch::search_chunks(self, query, limit, identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.fail {
                return Err(Error::EmbeddingError("connection reset".into()));
            }
            Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
        }

        fn dimension(&self) -> u64 {
            2
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        calls: Mutex<Vec<(u64, Option<ChunkFilter>)>>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn search(
            &self,
            vector: Vec<f32>,
            limit: u64,
            filter: Option<ChunkFilter>,
        ) -> Result<Vec<VectorSearchHit>> {
            assert_eq!(vector.len(), 2);
            self.calls.lock().unwrap().push((limit, filter));
            Ok(vec![VectorSearchHit {
                chunk: "Metformin is first-line therapy.".into(),
                score: 0.91,
            }])
        }
    }

    fn search(fail: bool) -> (KnowledgeBaseSearch, Arc<RecordingIndex>) {
        let index = Arc::new(RecordingIndex::default());
        let search = KnowledgeBaseSearch::new(Arc::new(FixedEmbedder { fail }), index.clone());
        (search, index)
    }

    #[tokio::test]
    async fn identity_becomes_user_filter() {
        let (search, index) = search(false);

        let hits = search
            .search_chunks("metformin", 5, Some("patient@example.com"))
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        let calls = index.calls.lock().unwrap();
        assert_eq!(calls[0].0, 5);
        assert_eq!(
            calls[0].1,
            Some(ChunkFilter::new().user("patient@example.com"))
        );
    }

    #[tokio::test]
    async fn no_identity_searches_whole_collection() {
        let (search, index) = search(false);

        search.search_chunks("metformin", 3, None).await.unwrap();
        search.search_chunks("metformin", 3, Some("  ")).await.unwrap();

        let calls = index.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, filter)| filter.is_none()));
    }

    #[tokio::test]
    async fn embedding_failure_skips_index() {
        let (search, index) = search(true);

        let err = search.search_chunks("metformin", 5, None).await.unwrap_err();

        assert!(matches!(err, Error::EmbeddingError(_)));
        assert!(index.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (search, index) = search(false);
        assert!(matches!(
            search.search_chunks(" ", 5, None).await,
            Err(Error::EmptyQuery)
        ));
        assert!(index.calls.lock().unwrap().is_empty());
    }
}
