//! Reduces a session's snapshot stream to a single reply.

use agent_chain_core::{AnyMessage, MessageContent};
use agent_graph::MessagesState;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::engine::ChatSession;
use crate::error::SessionError;

/// A snapshot whose shape could not be read.
#[derive(Debug, Error)]
#[error("malformed event: {0}")]
pub struct MalformedEvent(String);

impl MalformedEvent {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A streamed state snapshot the aggregator can read.
pub trait SnapshotEvent {
    /// Text of the last message when it came from the AI, `None` when the
    /// last message has another role.
    fn ai_text(&self) -> Result<Option<String>, MalformedEvent>;
}

impl SnapshotEvent for MessagesState {
    fn ai_text(&self) -> Result<Option<String>, MalformedEvent> {
        match self.last_message() {
            Some(AnyMessage::AI(message)) => Ok(Some(message.content().to_string())),
            Some(_) => Ok(None),
            None => Err(MalformedEvent::new("snapshot has no messages")),
        }
    }
}

/// Untyped snapshots shaped like a serialized [`MessagesState`].
impl SnapshotEvent for Value {
    fn ai_text(&self) -> Result<Option<String>, MalformedEvent> {
        let messages = self
            .get("messages")
            .ok_or_else(|| MalformedEvent::new("missing 'messages'"))?
            .as_array()
            .ok_or_else(|| MalformedEvent::new("'messages' is not an array"))?;
        let last = messages
            .last()
            .ok_or_else(|| MalformedEvent::new("'messages' is empty"))?;
        let role = last
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedEvent::new("last message has no type"))?;
        if role != "ai" {
            return Ok(None);
        }

        let content = last
            .get("content")
            .ok_or_else(|| MalformedEvent::new("last message has no content"))?;
        let content: MessageContent = serde_json::from_value(content.clone())
            .map_err(|e| MalformedEvent::new(format!("unreadable content: {e}")))?;
        Ok(Some(content.to_string()))
    }
}

/// Concatenate the AI text of every snapshot, in order.
///
/// Malformed snapshots are skipped. The first `Err` item ends the whole
/// aggregation with that error.
pub async fn aggregate<S, E>(stream: S) -> Result<String, SessionError>
where
    S: Stream<Item = Result<E, SessionError>>,
    E: SnapshotEvent,
{
    let mut stream = std::pin::pin!(stream);
    let mut text = String::new();
    let mut events = 0usize;

    while let Some(event) = stream.next().await {
        let event = event?;
        events += 1;
        match event.ai_text() {
            Ok(Some(part)) => text.push_str(&part),
            Ok(None) => {}
            Err(e) => tracing::warn!(event = events, error = %e, "Skipping malformed event"),
        }
    }

    tracing::debug!(events, chars = text.len(), "Aggregated response");
    Ok(text)
}

/// The caller-facing outcome of one chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Success { text: String, thread_id: String },
    Failure { message: String },
}

impl ChatResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Run `message` through `session` and shape the result for the caller.
///
/// Errors never escape: they become a [`ChatResponse::Failure`].
pub async fn respond(session: &ChatSession, message: &str) -> ChatResponse {
    match aggregate(session.handle_input_message(message)).await {
        Ok(text) => ChatResponse::Success {
            text,
            thread_id: session.thread_id().to_string(),
        },
        Err(e) => {
            tracing::warn!(thread_id = session.thread_id(), error = %e, "Failed to handle input message");
            ChatResponse::Failure {
                message: format!("Error while handling input message. {e}"),
            }
        }
    }
}
