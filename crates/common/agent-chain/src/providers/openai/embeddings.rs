//! OpenAI-compatible embeddings (`POST {api_base}/embeddings`).

use std::env;

use agent_chain_core::embeddings::Embeddings;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::providers::openai::{DEFAULT_API_BASE, build_client, error_for_status};
use crate::{Error, Result};

/// Embedding model served over the OpenAI embeddings API.
///
/// The API key is optional: self-hosted servers such as Ollama accept
/// unauthenticated requests.
#[derive(Clone)]
pub struct OpenAIEmbeddings {
    model: String,
    api_key: Option<SecretString>,
    api_base: String,
    timeout: Option<u64>,
}

impl std::fmt::Debug for OpenAIEmbeddings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddings")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAIEmbeddings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: env::var("OPENAI_API_KEY").ok().map(SecretString::from),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Request timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_internal(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let expected = texts.len();
        let client = build_client(self.timeout)?;

        tracing::debug!(model = %self.model, inputs = expected, "Requesting embeddings");

        let mut request = client
            .post(format!("{}/embeddings", self.api_base))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": self.model,
                "input": texts,
            }));
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = request.send().await.map_err(Error::Http)?;
        let response = error_for_status(response).await?;
        let body = response.text().await.map_err(Error::Http)?;
        let mut parsed: EmbeddingResponse = serde_json::from_str(&body)?;

        if parsed.data.len() != expected {
            return Err(Error::other(format!(
                "expected {expected} embeddings, received {}",
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embeddings for OpenAIEmbeddings {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.embed_internal(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_internal(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Other("No embeddings returned".to_string()))
    }
}
