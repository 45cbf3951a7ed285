use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Fixed-length query vector. Immutable for a session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    #[must_use]
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Error)]
pub enum EmbedError {
    /// Transient provider failure, safe to retry.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Permanent content rejection (unsupported file type, empty input).
    #[error("input rejected: {0}")]
    Rejected(String),
}

impl EmbedError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Opaque function mapping an input (image bytes or text) to a
/// fixed-dimension float vector. The core only sees this contract.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Embedding, EmbedError>;
    async fn embed_image(&self, bytes: &[u8]) -> Result<Embedding, EmbedError>;
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Client for the CLIP embedding sidecar.
pub struct RemoteEmbedder {
    http_client: Client,
    base_url: String,
}

impl RemoteEmbedder {
    /// Create the embedder client.
    ///
    /// # Panics
    /// if the HTTP client can't be constructed.
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn parse_response(response: reqwest::Response) -> Result<Embedding, EmbedError> {
        match response.status() {
            StatusCode::OK => {
                let body: EmbedResponse = response
                    .json()
                    .await
                    .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
                Ok(Embedding::new(body.embedding))
            }
            status if status.is_client_error() => {
                let text = response.text().await.unwrap_or_default();
                Err(EmbedError::Rejected(text))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(EmbedError::Unavailable(format!("{status}: {text}")))
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Embedding, EmbedError> {
        let url = format!("{}/embed/text", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        Self::parse_response(response).await
    }

    async fn embed_image(&self, bytes: &[u8]) -> Result<Embedding, EmbedError> {
        let url = format!("{}/embed/image", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header(http::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        Self::parse_response(response).await
    }
}
