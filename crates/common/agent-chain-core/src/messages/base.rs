use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AIMessage, HumanMessage, MessageContent, SystemMessage};

/// Types that carry an optional message id.
///
/// Reducers use the id to decide between replacing and appending.
pub trait HasId {
    fn get_id(&self) -> Option<String>;
}

/// The role of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    #[serde(rename = "ai")]
    AI,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::AI => f.write_str("ai"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Any message that can appear in a conversation.
///
/// Serialized with a `type` tag of `human`, `ai` or `system`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnyMessage {
    #[serde(rename = "human")]
    Human(HumanMessage),
    #[serde(rename = "ai")]
    AI(AIMessage),
    #[serde(rename = "system")]
    System(SystemMessage),
}

impl AnyMessage {
    pub fn role(&self) -> MessageRole {
        match self {
            Self::Human(_) => MessageRole::Human,
            Self::AI(_) => MessageRole::AI,
            Self::System(_) => MessageRole::System,
        }
    }

    pub fn content(&self) -> &MessageContent {
        match self {
            Self::Human(m) => &m.content,
            Self::AI(m) => &m.content,
            Self::System(m) => &m.content,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Human(m) => m.id.as_deref(),
            Self::AI(m) => m.id.as_deref(),
            Self::System(m) => m.id.as_deref(),
        }
    }

    pub fn as_ai(&self) -> Option<&AIMessage> {
        match self {
            Self::AI(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::AI(_))
    }
}

impl HasId for AnyMessage {
    fn get_id(&self) -> Option<String> {
        self.id().map(str::to_string)
    }
}

impl From<HumanMessage> for AnyMessage {
    fn from(message: HumanMessage) -> Self {
        Self::Human(message)
    }
}

impl From<AIMessage> for AnyMessage {
    fn from(message: AIMessage) -> Self {
        Self::AI(message)
    }
}

impl From<SystemMessage> for AnyMessage {
    fn from(message: SystemMessage) -> Self {
        Self::System(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let message: AnyMessage = AIMessage::new("hi").into();
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ai", "content": "hi"}));

        let back: AnyMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back.role(), MessageRole::AI);
        assert_eq!(back.content().as_text(), Some("hi"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<AnyMessage, _> =
            serde_json::from_value(serde_json::json!({"type": "tool", "content": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_has_id() {
        let message: AnyMessage = HumanMessage::new("q").with_id("m-1").into();
        assert_eq!(message.get_id().as_deref(), Some("m-1"));
        assert_eq!(message.role().to_string(), "human");
        assert!(!message.is_ai());
    }
}
