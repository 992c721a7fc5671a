//! Vector database integration with Qdrant

use async_trait::async_trait;
use qdrant_client::qdrant::{
    r#match::MatchValue, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance,
    FieldCondition, FieldType, Filter, Match, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};

use super::models::{ChunkRecord, VectorSearchHit};
use crate::error::Result;

/// Payload field holding the chunk text
pub const TEXT_FIELD: &str = "text";
/// Payload field holding the owner identity
pub const USER_FIELD: &str = "user_email";

/// Nearest-neighbour search over embedded chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<ChunkFilter>,
    ) -> Result<Vec<VectorSearchHit>>;
}

/// Chunk store backed by a Qdrant collection
pub struct ChunkStore {
    client: Qdrant,
    collection: String,
    dimension: u64,
}

impl ChunkStore {
    /// Connect to Qdrant server
    pub fn new(url: &str, collection: impl Into<String>, dimension: u64) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;

        Ok(Self {
            client,
            collection: collection.into(),
            dimension,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Initialize the collection if it doesn't exist
    pub async fn init_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            debug!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection '{}'", self.collection);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.as_str()).vectors_config(
                    VectorParamsBuilder::new(self.dimension, Distance::Cosine),
                ),
            )
            .await?;

        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                self.collection.as_str(),
                USER_FIELD,
                FieldType::Keyword,
            ))
            .await?;

        info!("Collection created successfully");
        Ok(())
    }

    /// Upsert chunks into the vector store
    pub async fn upsert_chunks(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let points: Vec<PointStruct> = chunks
            .iter()
            .filter(|chunk| !chunk.embedding.is_empty())
            .map(|chunk| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert(TEXT_FIELD.into(), chunk.text.clone().into());
                payload.insert(USER_FIELD.into(), chunk.user_email.clone().into());
                payload.insert("source".into(), chunk.source.clone().into());
                payload.insert("chunk_index".into(), (chunk.chunk_index as i64).into());

                PointStruct::new(chunk.id.to_string(), chunk.embedding.clone(), payload)
            })
            .collect();

        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        debug!("Upserting {} points to Qdrant", count);

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points).wait(true))
            .await?;

        info!("Successfully upserted {} chunks", count);
        Ok(count)
    }

    /// Get collection statistics
    pub async fn stats(&self) -> Result<CollectionStats> {
        let info = self.client.collection_info(self.collection.as_str()).await?;

        Ok(CollectionStats {
            points_count: info
                .result
                .map(|r| r.points_count.unwrap_or(0))
                .unwrap_or(0),
            dimension: self.dimension,
        })
    }
}

#[async_trait]
impl VectorIndex for ChunkStore {
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<ChunkFilter>,
    ) -> Result<Vec<VectorSearchHit>> {
        let mut search_builder =
            SearchPointsBuilder::new(self.collection.as_str(), vector, limit).with_payload(true);

        if let Some(f) = filter.and_then(ChunkFilter::into_qdrant_filter) {
            search_builder = search_builder.filter(f);
        }

        let results = self.client.search_points(search_builder).await?;

        Ok(results
            .result
            .into_iter()
            .map(|point| VectorSearchHit {
                chunk: point
                    .payload
                    .get(TEXT_FIELD)
                    .and_then(|v| v.as_text())
                    .map(str::to_string)
                    .unwrap_or_default(),
                score: point.score,
            })
            .collect())
    }
}

/// Equality filter for chunk search
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkFilter {
    pub user_email: Option<String>,
}

impl ChunkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_email: impl Into<String>) -> Self {
        self.user_email = Some(user_email.into());
        self
    }

    /// `None` when no condition is set, so the whole collection is searched
    fn into_qdrant_filter(self) -> Option<Filter> {
        let mut conditions = Vec::new();

        if let Some(user_email) = self.user_email {
            conditions.push(
                FieldCondition {
                    key: USER_FIELD.to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(user_email)),
                    }),
                    ..Default::default()
                }
                .into(),
            );
        }

        if conditions.is_empty() {
            None
        } else {
            Some(Filter::must(conditions))
        }
    }
}

/// Collection statistics
#[derive(Debug)]
pub struct CollectionStats {
    pub points_count: u64,
    pub dimension: u64,
}

trait QdrantValueExt {
    fn as_text(&self) -> Option<&str>;
}

impl QdrantValueExt for QdrantValue {
    fn as_text(&self) -> Option<&str> {
        match &self.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }
}
