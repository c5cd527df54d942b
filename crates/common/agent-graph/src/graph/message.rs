//! Message module for graph workflows.
//!
//! This module provides the append-only `add_messages` reducer and the
//! conversation state built on it.

use std::collections::HashSet;

use agent_chain_core::messages::AnyMessage;
pub use agent_chain_core::messages::HasId;
use serde::{Deserialize, Serialize};

use super::state::GraphState;
use crate::error::{GraphError, Result};

/// Appends `right` to `left`, keeping history append-only.
///
/// A message whose id is already present in `left` (or repeated within
/// `right`) is rejected and `left` is left untouched. Messages without an
/// id are always appended.
///
/// # Errors
///
/// Returns [`GraphError::InvalidUpdate`] naming the colliding id.
pub fn add_messages<T: HasId>(left: &mut Vec<T>, right: Vec<T>) -> Result<()> {
    let mut seen: HashSet<String> = left.iter().filter_map(HasId::get_id).collect();
    for msg in &right {
        let Some(id) = msg.get_id() else { continue };
        if seen.contains(&id) {
            return Err(GraphError::invalid_update(format!(
                "message id '{id}' is already in the history"
            )));
        }
        seen.insert(id);
    }

    left.extend(right);
    Ok(())
}

/// Conversation state: the ordered message history of one thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesState {
    pub messages: Vec<AnyMessage>,
}

impl MessagesState {
    pub fn new(messages: Vec<AnyMessage>) -> Self {
        Self { messages }
    }

    pub fn last_message(&self) -> Option<&AnyMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl GraphState for MessagesState {
    type Update = Vec<AnyMessage>;

    /// Messages without an id get a fresh one. Reusing an existing id is
    /// an error: checkpointed history is never rewritten.
    fn apply(&mut self, update: Self::Update) -> Result<()> {
        let update = update
            .into_iter()
            .map(|message| {
                if message.id().is_some() {
                    message
                } else {
                    with_id(message, uuid::Uuid::new_v4().to_string())
                }
            })
            .collect();
        add_messages(&mut self.messages, update)
    }
}

fn with_id(message: AnyMessage, id: String) -> AnyMessage {
    match message {
        AnyMessage::Human(m) => m.with_id(id).into(),
        AnyMessage::AI(m) => m.with_id(id).into(),
        AnyMessage::System(m) => m.with_id(id).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_chain_core::messages::{AIMessage, HumanMessage};

    #[derive(Clone, Debug, PartialEq)]
    struct TestMessage {
        id: Option<String>,
        content: String,
    }

    impl HasId for TestMessage {
        fn get_id(&self) -> Option<String> {
            self.id.clone()
        }
    }

    fn msg(id: Option<&str>, content: &str) -> TestMessage {
        TestMessage {
            id: id.map(str::to_string),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_add_messages_append() {
        let mut left = vec![msg(Some("1"), "Hello")];
        add_messages(&mut left, vec![msg(Some("2"), "World"), msg(None, "!")]).unwrap();

        assert_eq!(left.len(), 3);
        assert_eq!(left[0].content, "Hello");
        assert_eq!(left[1].content, "World");
        assert_eq!(left[2].content, "!");
    }

    #[test]
    fn test_add_messages_rejects_existing_id() {
        let mut left = vec![msg(Some("1"), "Hello")];
        let err = add_messages(&mut left, vec![msg(Some("2"), "ok"), msg(Some("1"), "Updated")])
            .unwrap_err();

        assert!(err.is_invalid_update());
        assert_eq!(left, vec![msg(Some("1"), "Hello")]);
    }

    #[test]
    fn test_add_messages_rejects_repeated_id_in_update() {
        let mut left: Vec<TestMessage> = vec![];
        let err = add_messages(&mut left, vec![msg(Some("a"), "x"), msg(Some("a"), "y")]);
        assert!(err.is_err());
        assert!(left.is_empty());
    }

    #[test]
    fn test_apply_never_rewrites_history() {
        let mut state = MessagesState::default();
        state
            .apply(vec![HumanMessage::new("original").with_id("m1").into()])
            .unwrap();

        let err = state
            .apply(vec![AIMessage::new("replacement").with_id("m1").into()])
            .unwrap_err();
        assert!(err.is_invalid_update());
        assert_eq!(state.len(), 1);
        assert_eq!(state.messages[0].content().to_string(), "original");
    }

    #[test]
    fn test_apply_assigns_ids_and_appends() {
        let mut state = MessagesState::default();
        state.apply(vec![HumanMessage::new("hi").into()]).unwrap();
        state.apply(vec![AIMessage::new("hello").into()]).unwrap();

        assert_eq!(state.len(), 2);
        assert!(state.messages.iter().all(|m| m.id().is_some()));
        assert_ne!(state.messages[0].id(), state.messages[1].id());
        assert!(state.last_message().unwrap().is_ai());
    }

    #[test]
    fn test_apply_identical_content_is_not_deduplicated() {
        let mut state = MessagesState::default();
        state.apply(vec![HumanMessage::new("same").into()]).unwrap();
        state.apply(vec![HumanMessage::new("same").into()]).unwrap();
        assert_eq!(state.len(), 2);
    }
}
