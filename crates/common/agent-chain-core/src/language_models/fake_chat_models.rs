use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::language_models::{ChatModel, GenerationParams};
use crate::messages::{AIMessage, AnyMessage};

/// A recorded call to a fake chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub messages: Vec<AnyMessage>,
    pub params: GenerationParams,
}

/// Fake chat model that replies with a fixed list of responses, cycling
/// back to the first once the list is exhausted.
///
/// Every call is recorded so tests can inspect the history a model saw.
#[derive(Debug)]
pub struct FakeListChatModel {
    responses: Vec<String>,
    index: AtomicUsize,
    error: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeListChatModel {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            index: AtomicUsize::new(0),
            error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(vec![])
        }
    }

    pub fn current_index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn get_next_response(&self) -> String {
        if self.responses.is_empty() {
            return String::new();
        }
        let i = self.index.load(Ordering::SeqCst);
        let response = self.responses.get(i).cloned().unwrap_or_default();
        let next_i = if i + 1 < self.responses.len() { i + 1 } else { 0 };
        self.index.store(next_i, Ordering::SeqCst);
        response
    }
}

#[async_trait]
impl ChatModel for FakeListChatModel {
    fn model_name(&self) -> &str {
        "fake-list-chat-model"
    }

    async fn invoke(
        &self,
        messages: &[AnyMessage],
        params: &GenerationParams,
    ) -> Result<AIMessage> {
        self.calls.lock().push(RecordedCall {
            messages: messages.to_vec(),
            params: *params,
        });
        if let Some(ref message) = self.error {
            return Err(Error::other(message.clone()));
        }
        Ok(AIMessage::new(self.get_next_response()))
    }
}
