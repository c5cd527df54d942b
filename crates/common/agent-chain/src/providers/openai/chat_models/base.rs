//! OpenAI chat model implementation (Chat Completions API).

use std::collections::HashMap;
use std::env;

use agent_chain_core::language_models::{ChatModel, GenerationParams};
use agent_chain_core::messages::{AIMessage, AnyMessage, MessageContent};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::providers::openai::{DEFAULT_API_BASE, build_client, error_for_status};
use crate::{Error, Result};

/// OpenAI-compatible chat model.
///
/// One `invoke` is one `POST {api_base}/chat/completions`. Requests are
/// not retried; the temperature given per call is sent as is.
#[derive(Clone)]
pub struct ChatOpenAI {
    model: String,
    max_tokens: Option<u32>,
    api_key: Option<SecretString>,
    api_base: String,
    organization: Option<String>,
    timeout: Option<u64>,
}

impl std::fmt::Debug for ChatOpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOpenAI")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a MessageContent,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

impl ChatOpenAI {
    /// Create a new ChatOpenAI instance.
    ///
    /// The API base defaults to `OPENAI_API_BASE` / `OPENAI_BASE_URL`, then
    /// to the public OpenAI endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        let api_base = env::var("OPENAI_API_BASE")
            .ok()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            model: model.into(),
            max_tokens: None,
            api_key: None,
            api_base,
            organization: env::var("OPENAI_ORG_ID").ok(),
            timeout: None,
        }
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Request timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn get_api_base(&self) -> &str {
        &self.api_base
    }

    fn get_api_key(&self) -> Result<String> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().to_string())
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| Error::missing_config("OPENAI_API_KEY"))
    }

    fn build_payload(&self, messages: &[AnyMessage], temperature: f64) -> serde_json::Value {
        let wire: Vec<WireMessage<'_>> = messages
            .iter()
            .map(|message| WireMessage {
                role: match message {
                    AnyMessage::Human(_) => "user",
                    AnyMessage::AI(_) => "assistant",
                    AnyMessage::System(_) => "system",
                },
                content: message.content(),
            })
            .collect();

        let mut payload = serde_json::json!({
            "model": self.model,
            "messages": wire,
            "temperature": temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            payload["max_tokens"] = serde_json::json!(max_tokens);
        }
        payload
    }
}

#[async_trait]
impl ChatModel for ChatOpenAI {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        messages: &[AnyMessage],
        params: &GenerationParams,
    ) -> Result<AIMessage> {
        let api_key = self.get_api_key()?;
        let client = build_client(self.timeout)?;
        let payload = self.build_payload(messages, params.temperature);

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            temperature = params.temperature,
            "Calling chat completions"
        );

        let mut request = client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json");

        if let Some(ref org) = self.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.json(&payload).send().await.map_err(Error::Http)?;
        let response = error_for_status(response).await?;
        let body = response.text().await.map_err(Error::Http)?;
        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::other("chat completion response contained no choices"))?;

        let mut metadata = HashMap::new();
        if let Some(id) = completion.id {
            metadata.insert("id".to_string(), serde_json::Value::from(id));
        }
        metadata.insert(
            "model_name".to_string(),
            serde_json::Value::from(completion.model.unwrap_or_else(|| self.model.clone())),
        );
        if let Some(reason) = choice.finish_reason {
            metadata.insert("finish_reason".to_string(), serde_json::Value::from(reason));
        }

        Ok(AIMessage::new(choice.message.content.unwrap_or_default())
            .with_response_metadata(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_chain_core::messages::{ContentPart, HumanMessage, SystemMessage};

    #[test]
    fn test_payload_roles_and_temperature() {
        let model = ChatOpenAI::new("llama3.2").max_tokens(64);
        let messages: Vec<AnyMessage> = vec![
            SystemMessage::new("be brief").into(),
            HumanMessage::new("hi").into(),
            AIMessage::new("hello").into(),
        ];
        let payload = model.build_payload(&messages, 1.7);

        assert_eq!(payload["model"], "llama3.2");
        assert_eq!(payload["temperature"], 1.7);
        assert_eq!(payload["max_tokens"], 64);
        let roles: Vec<_> = payload["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
    }

    #[test]
    fn test_payload_multipart_content() {
        let model = ChatOpenAI::new("gpt-4o");
        let messages: Vec<AnyMessage> =
            vec![HumanMessage::new(vec![ContentPart::text("look")]).into()];
        let payload = model.build_payload(&messages, 0.0);
        assert_eq!(
            payload["messages"][0]["content"],
            serde_json::json!([{"type": "text", "text": "look"}])
        );
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let model = ChatOpenAI::new("m").api_base("http://localhost:11434/v1/");
        assert_eq!(model.get_api_base(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let model = ChatOpenAI::new("m").api_key("sk-secret");
        assert!(!format!("{model:?}").contains("sk-secret"));
    }
}
