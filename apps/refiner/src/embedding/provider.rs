use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::errors::AppError;

/// An embedding backend. Implementations return one fixed-length vector per text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider id, part of the cache key.
    fn provider_id(&self) -> &str;
    /// Model id, part of the cache key.
    fn model_id(&self) -> &str;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/v1/embeddings` client.
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    api_url: String,
    api_key: String,
    provider: String,
    model: String,
}

impl HttpEmbeddingProvider {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Option<Self>, AppError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            provider: config.provider.clone(),
            model: config.model.clone(),
        }))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn provider_id(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "provider returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("malformed response: {e}")))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Embedding("provider returned no embedding".to_string()))?;

        debug!("Embedded {} chars into {} dims", text.len(), vector.len());
        Ok(vector)
    }
}
