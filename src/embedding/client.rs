//! Embedding service client
//!
//! A thin async wrapper over the Generative Language `embedContent` endpoint.
//! The client is constructed explicitly by the composition root with its API
//! key and model; nothing here reads ambient global state. Service failures
//! propagate unchanged so callers never index partial or garbage vectors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AssistantError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which side of the retrieval pair a text is embedded for.
///
/// Document-side and query-side embeddings may use different encodings from
/// the same model family but live in the same vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Seam between the retrieval stack and the external embedding service.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed one text, returning a fixed-dimension vector.
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>>;

    /// Model identifier recorded alongside persisted embeddings.
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: ContentPayload<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct ContentPayload<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// HTTP client for the Generative Language embedding API
pub struct GeminiEmbeddings {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiEmbeddings {
    /// Create a new embedding client for a model such as
    /// `text-embedding-004`.
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
        }
    }

    /// Override the service base URL (used against local stand-ins).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiEmbeddings {
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: ContentPayload {
                parts: vec![TextPart { text }],
            },
            task_type: task.as_str(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::EmbeddingService(format!(
                "{status}: {body}"
            )));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::EmbeddingService(format!("bad response: {e}")))?;

        Ok(parsed.embedding.values)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
