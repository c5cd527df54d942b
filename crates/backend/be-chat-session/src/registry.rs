//! Embedding models the session engine accepts.

use std::path::PathBuf;
use std::sync::Arc;

use agent_chain::{OnnxEmbeddings, OpenAIEmbeddings, Pooling};
use agent_chain_core::Embeddings;
use secrecy::ExposeSecret;

use crate::config::Settings;
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingModel {
    BgeSmallEnV15,
}

impl EmbeddingModel {
    pub const ALL: &'static [EmbeddingModel] = &[EmbeddingModel::BgeSmallEnV15];

    /// Look up a supported model by its identifier.
    ///
    /// Matching is exact. Nothing is loaded or contacted here.
    pub fn resolve(id: &str) -> Result<Self, SessionError> {
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.id() == id)
            .ok_or_else(|| SessionError::unknown_model(id))
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::BgeSmallEnV15 => "BAAI/bge-small-en-v1.5",
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::BgeSmallEnV15 => 384,
        }
    }

    /// Pooling the model was trained with.
    pub fn pooling(&self) -> Pooling {
        match self {
            Self::BgeSmallEnV15 => Pooling::Cls,
        }
    }

    /// Where this model's `model.onnx` and `tokenizer.json` live.
    pub fn model_dir(&self, settings: &Settings) -> PathBuf {
        settings.embedding_model_dir.join(self.id())
    }

    /// An embeddings client for this model.
    ///
    /// Vectors are computed in process on `settings.embedding_device`,
    /// unless `settings.embeddings_url` points at a server that hosts the
    /// model.
    pub async fn client(&self, settings: &Settings) -> Result<Arc<dyn Embeddings>, SessionError> {
        if let Some(url) = &settings.embeddings_url {
            tracing::debug!(model = self.id(), url = %url, "Using remote embedding backend");
            return Ok(Arc::new(
                OpenAIEmbeddings::new(self.id())
                    .api_base(url.as_str())
                    .api_key(settings.llm_api_key.expose_secret())
                    .timeout(settings.request_timeout_secs),
            ));
        }

        let embeddings = OnnxEmbeddings::load(self.model_dir(settings), settings.embedding_device)
        .await
        .map_err(|e| {
            SessionError::vector_store(format!("Failed to load embedding model '{}'", self.id()), e)
        })?
        .pooling(self.pooling())
        .normalize(true);
        Ok(Arc::new(embeddings))
    }
}

impl std::fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
