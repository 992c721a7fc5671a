//! Error types for knowledge graph ingestion and retrieval

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("No valid query terms in: {0:?}")]
    NoValidQueryTerms(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid relation type: {0:?}")]
    InvalidRelationType(String),

    #[error("Relation {relation_id} references a missing entity ({head} -> {tail})")]
    MissingRelationEndpoint {
        relation_id: String,
        head: String,
        tail: String,
    },

    #[error("Graph database error: {0}")]
    GraphError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("Embedding API error: {0}")]
    EmbeddingError(String),

    #[error("Full-text index '{index}' not ready after {seconds}s")]
    IndexTimeout { index: String, seconds: u64 },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors caused by the caller's input. Retrying the same request cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::EmptyQuery
                | Error::NoValidQueryTerms(_)
                | Error::InvalidArgument(_)
                | Error::InvalidDocument(_)
                | Error::InvalidRelationType(_)
        )
    }
}

impl From<neo4rs::Error> for Error {
    fn from(err: neo4rs::Error) -> Self {
        Error::GraphError(err.to_string())
    }
}

impl From<neo4rs::DeError> for Error {
    fn from(err: neo4rs::DeError) -> Self {
        Error::GraphError(format!("failed to decode row: {}", err))
    }
}

impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::VectorStoreError(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Error::EmbeddingError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
