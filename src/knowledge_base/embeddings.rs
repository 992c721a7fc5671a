//! Embedding generation through an OpenAI-compatible endpoint

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::EmbeddingSettings;
use crate::error::{Error, Result};

/// Longest input sent to the endpoint, in characters
const MAX_INPUT_CHARS: usize = 8000;

/// Turns text into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed many texts; blank texts map to empty vectors at the same index
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> u64;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(Error::EmbeddingError("no embedding returned".into()));
        }
        Ok(embedding)
    }
}

/// Service for generating text embeddings
pub struct EmbeddingService {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    dimension: u64,
}

impl EmbeddingService {
    /// Create a client for the configured endpoint, model and HTTP timeout
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(Error::ConfigError(
                "embedding api_key not set (EMBEDDING_API_KEY or OPENAI_API_KEY)".into(),
            ));
        }

        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.base_url.clone());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: OpenAIClient::with_config(config).with_http_client(http),
            model: settings.model.clone(),
            dimension: settings.dimension,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn prepare(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > MAX_INPUT_CHARS {
        trimmed.chars().take(MAX_INPUT_CHARS).collect()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let processed: Vec<String> = texts
            .iter()
            .map(|t| prepare(t))
            .filter(|t| !t.is_empty())
            .collect();

        if processed.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(processed))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        info!(
            "Generated {} embeddings, tokens used: {}",
            response.data.len(),
            response.usage.total_tokens
        );

        // Map back to original indices (empty texts get empty vectors)
        let mut embed_iter = response.data.into_iter();
        let mut result = Vec::with_capacity(texts.len());

        for text in texts {
            if text.trim().is_empty() {
                result.push(Vec::new());
                continue;
            }
            let embedding = embed_iter
                .next()
                .ok_or_else(|| Error::EmbeddingError("fewer embeddings than inputs".into()))?
                .embedding;
            if embedding.len() as u64 != self.dimension {
                warn!(
                    "Model {} returned {} dimensions, expected {}",
                    self.model,
                    embedding.len(),
                    self.dimension
                );
            }
            result.push(embedding);
        }

        Ok(result)
    }

    fn dimension(&self) -> u64 {
        self.dimension
    }
}
