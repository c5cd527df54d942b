use agent_chain::ChatOpenAI;
use agent_chain_core::{AnyMessage, ChatModel, Error, GenerationParams, HumanMessage};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn history() -> Vec<AnyMessage> {
    vec![HumanMessage::new("hi").into()]
}

fn completion(content: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "model": "llama3.2",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_invoke_sends_history_and_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer ollama"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "temperature": 1.5,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!("hello"))))
        .expect(1)
        .mount(&server)
        .await;

    let model = ChatOpenAI::new("llama3.2")
        .api_base(format!("{}/v1", server.uri()))
        .api_key("ollama");
    let reply = model
        .invoke(&history(), &GenerationParams { temperature: 1.5 })
        .await
        .unwrap();

    assert_eq!(reply.content.as_text(), Some("hello"));
    assert_eq!(reply.response_metadata["finish_reason"], "stop");
}

#[tokio::test]
async fn test_invoke_accepts_parts_and_null_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!([
            {"type": "text", "text": "a"},
            {"type": "text", "text": "b"}
        ]))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(null))))
        .mount(&server)
        .await;

    let model = ChatOpenAI::new("m").api_base(server.uri()).api_key("k");
    let params = GenerationParams::default();

    let parts = model.invoke(&history(), &params).await.unwrap();
    assert_eq!(parts.content.to_string(), "ab");

    let empty = model.invoke(&history(), &params).await.unwrap();
    assert!(empty.content.is_empty());
}

#[tokio::test]
async fn test_invoke_maps_error_status_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let model = ChatOpenAI::new("m").api_base(server.uri()).api_key("k");
    let err = model
        .invoke(&history(), &GenerationParams::default())
        .await
        .unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invoke_rejects_unparsable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let model = ChatOpenAI::new("m").api_base(server.uri()).api_key("k");
    let err = model
        .invoke(&history(), &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn test_invoke_without_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let model = ChatOpenAI::new("m").api_base(server.uri()).api_key("k");
    assert!(
        model
            .invoke(&history(), &GenerationParams::default())
            .await
            .is_err()
    );
}
