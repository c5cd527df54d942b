use serde::{Deserialize, Serialize};

use super::MessageContent;

/// A message from the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: MessageContent,
}

impl HumanMessage {
    pub fn new(content: impl Into<MessageContent>) -> Self {
        Self {
            id: None,
            content: content.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }
}
