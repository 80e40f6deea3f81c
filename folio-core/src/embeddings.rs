//! Embedding provider client.
//!
//! `EmbeddingBackend` abstracts the vector provider so subsystems and
//! tests can swap in mocks. The production implementation calls the
//! Gemini embeddings API with retry/backoff and validates the response
//! shape before handing the vector to callers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::EmbeddingSettings;

/// A provider response: the vector plus the model/shape that produced it,
/// so callers can verify they are storing what they expect.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

/// Abstraction over embedding providers.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Model name this backend reports in its responses.
    fn model(&self) -> &str;

    /// Vector dimension this backend produces.
    fn dimensions(&self) -> usize;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Invalid response: expected {expected} dimensions, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    model: String,
    content: GeminiContent,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    embedding: GeminiEmbedding,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiEmbeddingClient
// ============================================================================

/// Gemini embedding client — calls the Gemini Embeddings API.
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingClient {
    client: Client,
    api_key: String,
    settings: EmbeddingSettings,
    base_url: String,
}

impl GeminiEmbeddingClient {
    pub fn new(
        api_key: Option<String>,
        settings: EmbeddingSettings,
    ) -> Result<Self, EmbeddingError> {
        Self::with_base_url(
            api_key,
            settings,
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
        )
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        api_key: Option<String>,
        settings: EmbeddingSettings,
        base_url: String,
    ) -> Result<Self, EmbeddingError> {
        let api_key = api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .unwrap_or_default();
        if api_key.is_empty() {
            return Err(EmbeddingError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            settings,
            base_url,
        })
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.settings.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.settings.max_retries);

        match Retry::spawn(retry_strategy, || self.embed_once(text)).await {
            Ok(vec) => Ok(vec),
            Err(e) => {
                tracing::error!(
                    attempts = self.settings.max_retries,
                    error = %e,
                    "All embedding retry attempts failed"
                );
                Err(EmbeddingError::RetryExhausted {
                    attempts: self.settings.max_retries,
                })
            }
        }
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.base_url, self.settings.model, self.api_key
        );

        let request = GeminiRequest {
            model: format!("models/{}", self.settings.model),
            content: GeminiContent {
                parts: vec![GeminiPart {
                    text: text.to_string(),
                }],
            },
            output_dimensionality: self.settings.dimensions,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(EmbeddingError::Api { code, message });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let values = gemini_response.embedding.values;

        if values.len() != self.settings.dimensions {
            return Err(EmbeddingError::InvalidDimensions {
                expected: self.settings.dimensions,
                actual: values.len(),
            });
        }

        Ok(values)
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let vector = self.embed_with_retry(text).await?;
        let dimensions = vector.len();
        Ok(Embedding {
            vector,
            model: self.settings.model.clone(),
            dimensions,
        })
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn dimensions(&self) -> usize {
        self.settings.dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================
