use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::MessageContent;

/// A message produced by a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: MessageContent,
    /// Provider details such as the model name and finish reason.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub response_metadata: HashMap<String, Value>,
}

impl AIMessage {
    pub fn new(content: impl Into<MessageContent>) -> Self {
        Self {
            id: None,
            content: content.into(),
            response_metadata: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_response_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.response_metadata = metadata;
        self
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }
}
