use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::messages::{AIMessage, AnyMessage};

/// Per-call generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature, passed to the provider unmodified.
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: 0.7 }
    }
}

/// A chat-completion model.
///
/// One `invoke` is one call to the provider: the full history goes in and
/// exactly one AI message comes out. Implementations do not retry.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier of the underlying model, e.g. `llama3.2`.
    fn model_name(&self) -> &str;

    async fn invoke(&self, messages: &[AnyMessage], params: &GenerationParams)
    -> Result<AIMessage>;
}
