//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::Settings;
use crate::error::{GrunnError, Result, ServiceErrorKind};
use crate::openai::{classify_error, create_client};
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Inputs per request; OpenAI caps the batch size.
const DEFAULT_BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder with a ready client.
    pub fn new(client: Client<OpenAIConfig>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Create an embedder from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.api_key();
        let client = create_client(
            api_key.as_deref(),
            Duration::from_secs(settings.openai.timeout_secs),
        )?;

        Ok(Self::new(
            client,
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )
        .with_batch_size(settings.embedding.batch_size))
    }

    /// Set the number of texts sent per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

fn service_error(kind: ServiceErrorKind, message: String) -> GrunnError {
    GrunnError::EmbeddingService { kind, message }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| {
            service_error(
                ServiceErrorKind::Unavailable,
                "Empty embedding response".to_string(),
            )
        })
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(batch.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| {
                    service_error(
                        ServiceErrorKind::MalformedRequest,
                        format!("Failed to build request: {}", e),
                    )
                })?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| service_error(classify_error(&e), format!("Embedding API error: {}", e)))?;

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                all_embeddings.push(embedding_data.embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
