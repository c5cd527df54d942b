use std::sync::Arc;

use agent_chain_core::{
    ChatModel, Document, Embeddings, FakeListChatModel, MessageContent, MessageRole,
};
use agent_graph::InMemorySaver;
use agent_graph_checkpoint::CheckpointSaver;
use async_trait::async_trait;
use be_chat_session::{
    ChatResponse, ChatSession, RetrievalGraph, SessionError, SessionOptions, Settings, aggregate,
    respond,
};
use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Bag-of-words embedding over a fixed vocabulary.
struct KeywordEmbedding {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedding {
    fn new(vocabulary: Vec<&'static str>) -> Self {
        Self { vocabulary }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let words: Vec<&str> = text.split_whitespace().collect();
        self.vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embeddings for KeywordEmbedding {
    async fn embed_documents(&self, texts: Vec<String>) -> agent_chain_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> agent_chain_core::Result<Vec<f32>> {
        Ok(self.embed(text))
    }
}

fn settings(dir: &std::path::Path) -> Settings {
    Settings {
        vector_store_dir: dir.to_path_buf(),
        collection: "integration".to_string(),
        ..Settings::default()
    }
}

fn keyword_embeddings() -> Arc<dyn Embeddings> {
    Arc::new(KeywordEmbedding::new(vec![
        "hanging", "gardens", "babylon", "ziggurat", "river", "euphrates", "bread", "oven",
    ]))
}

fn fake_model(responses: &[&str]) -> Arc<FakeListChatModel> {
    Arc::new(FakeListChatModel::new(
        responses.iter().map(|r| r.to_string()).collect(),
    ))
}

async fn session_with_model(
    settings: &Settings,
    thread_id: &str,
    model: Arc<FakeListChatModel>,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
) -> ChatSession {
    let model: Arc<dyn ChatModel> = model;
    let options = SessionOptions::builder()
        .embedding_model(EMBEDDING_MODEL)
        .llm_model("llama3.2")
        .thread_id(thread_id)
        .chat_model(model)
        .embeddings(keyword_embeddings())
        .maybe_checkpointer(checkpointer)
        .build();
    ChatSession::new(settings, options).await.unwrap()
}

fn text_of(content: &MessageContent) -> String {
    content.to_string()
}

#[tokio::test]
async fn test_unknown_model_fails_before_any_io() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let settings = Settings {
        embeddings_url: Some(format!("{}/v1", server.uri())),
        ..settings(&store_dir)
    };

    let err = ChatSession::new(
        &settings,
        SessionOptions::builder()
            .embedding_model("bogus/model")
            .llm_model("llama3.2")
            .model_url(format!("{}/v1", server.uri()))
            .build(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SessionError::UnknownModel(ref id) if id == "bogus/model"));
    assert!(!store_dir.exists());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_call_sees_first_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let model = fake_model(&["a1", "a2"]);
    let session = session_with_model(&settings(dir.path()), "t1", model.clone(), None).await;

    assert!(respond(&session, "h1").await.is_success());
    assert!(respond(&session, "h2").await.is_success());

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    let seen: Vec<String> = calls[1]
        .messages
        .iter()
        .map(|m| text_of(m.content()))
        .collect();
    assert_eq!(seen, vec!["h1", "a1", "h2"]);
    assert_eq!(calls[1].messages[1].role(), MessageRole::AI);

    let history = session.history().await.unwrap();
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn test_shared_checkpointer_spans_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let checkpointer: Arc<dyn CheckpointSaver> = Arc::new(InMemorySaver::new());

    let first = session_with_model(&settings, "shared", fake_model(&["one"]), Some(checkpointer.clone())).await;
    respond(&first, "hello").await;

    let model = fake_model(&["two"]);
    let second = session_with_model(&settings, "shared", model.clone(), Some(checkpointer.clone())).await;
    respond(&second, "again").await;

    assert_eq!(model.calls()[0].messages.len(), 3);

    let other = session_with_model(&settings, "other", fake_model(&["x"]), Some(checkpointer.clone())).await;
    assert!(other.history().await.unwrap().is_empty());
    assert_eq!(
        checkpointer.list_threads().await.unwrap(),
        vec!["shared".to_string()]
    );
}

#[tokio::test]
async fn test_end_to_end_against_openai_compatible_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "llama3.2", "temperature": 0.7})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "llama3.2",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello from the model"},
                "finish_reason": "stop"
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = ChatSession::new(
        &settings(dir.path()),
        SessionOptions::builder()
            .embedding_model(EMBEDDING_MODEL)
            .llm_model("llama3.2")
            .model_url(format!("{}/v1", server.uri()))
            .thread_id("t1")
            .embeddings(keyword_embeddings())
            .build(),
    )
    .await
    .unwrap();

    let events: Vec<_> = session.handle_input_message("hi").collect().await;
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.is_ok()));

    let history = session.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content().as_text(), Some("Hello from the model"));

    match respond(&session, "hi").await {
        ChatResponse::Success { text, thread_id } => {
            assert!(!text.is_empty());
            assert_eq!(thread_id, "t1");
        }
        ChatResponse::Failure { message } => panic!("unexpected failure: {message}"),
    }
    assert_eq!(session.thread_id(), "t1");
}

#[tokio::test]
async fn test_respond_returns_text_and_thread_id() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_model(&settings(dir.path()), "t1", fake_model(&["hello there"]), None).await;

    assert_eq!(
        respond(&session, "hi").await,
        ChatResponse::Success {
            text: "hello there".to_string(),
            thread_id: "t1".to_string(),
        }
    );
}

#[tokio::test]
async fn test_model_failure_becomes_failure_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session = ChatSession::new(
        &settings(dir.path()),
        SessionOptions::builder()
            .embedding_model(EMBEDDING_MODEL)
            .llm_model("llama3.2")
            .model_url(format!("{}/v1", server.uri()))
            .thread_id("t1")
            .embeddings(keyword_embeddings())
            .build(),
    )
    .await
    .unwrap();

    let err = aggregate(session.handle_input_message("hi")).await.unwrap_err();
    assert!(err.is_model_invocation());
    assert!(err.to_string().contains("llama3.2"));

    // The human message was checkpointed before the model ran.
    let history = session.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role(), MessageRole::Human);

    match respond(&session, "hi").await {
        ChatResponse::Failure { message } => {
            assert!(message.starts_with("Error while handling input message. "));
            assert!(message.contains("500"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_search_ranks_containing_document_first() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_model(&settings(dir.path()), "t1", fake_model(&[]), None).await;
    let retriever = session.retriever();

    retriever
        .add_documents(vec![
            Document::from("the river euphrates flows south"),
            Document::from("the hanging gardens of babylon"),
            Document::from("bread baked in a clay oven"),
        ])
        .await
        .unwrap();

    let results = retriever.similarity_search("hanging gardens", 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0.page_content, "the hanging gardens of babylon");
    let min = results.iter().map(|(_, d)| *d).fold(f32::INFINITY, f32::min);
    assert_eq!(results[0].1, min);
}

#[tokio::test]
async fn test_ingestion_does_not_deduplicate() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_model(&settings(dir.path()), "t1", fake_model(&[]), None).await;

    let first = session
        .retriever()
        .add_documents(vec![Document::from("babylon ziggurat")])
        .await
        .unwrap();
    let second = session
        .retriever()
        .add_documents(vec![Document::from("babylon ziggurat")])
        .await
        .unwrap();
    assert_ne!(first, second);

    let results = session.retriever().similarity_search("ziggurat", 5).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_retrieval_graph_passes_context_to_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = fake_model(&["It was in Mesopotamia."]);
    let chat_model: Arc<dyn ChatModel> = model.clone();
    let session = ChatSession::new(
        &settings(dir.path()),
        SessionOptions::builder()
            .embedding_model(EMBEDDING_MODEL)
            .llm_model("llama3.2")
            .thread_id("t1")
            .chat_model(chat_model)
            .embeddings(keyword_embeddings())
            .graph_builder(Arc::new(RetrievalGraph))
            .build(),
    )
    .await
    .unwrap();
    session
        .retriever()
        .add_documents(vec![Document::from("babylon stood on the river euphrates")])
        .await
        .unwrap();

    let response = respond(&session, "where was babylon").await;
    assert!(response.is_success());

    let seen = &model.calls()[0].messages;
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].role(), MessageRole::System);
    assert!(text_of(seen[1].content()).contains("river euphrates"));
}

#[tokio::test]
async fn test_dropping_stream_keeps_completed_steps() {
    let dir = tempfile::tempdir().unwrap();
    let model = fake_model(&["never seen"]);
    let session = session_with_model(&settings(dir.path()), "t1", model.clone(), None).await;

    {
        let mut stream = Box::pin(session.handle_input_message("only the input"));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
    }

    assert_eq!(model.call_count(), 0);
    assert_eq!(session.history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sessions_on_one_store_see_each_others_documents() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let first = session_with_model(&settings, "a", fake_model(&[]), None).await;
    let second = session_with_model(&settings, "b", fake_model(&[]), None).await;

    first
        .retriever()
        .add_documents(vec![Document::from("the hanging gardens of babylon")])
        .await
        .unwrap();
    second
        .retriever()
        .add_documents(vec![Document::from("bread baked in a clay oven")])
        .await
        .unwrap();

    for session in [&first, &second] {
        let results = session.retriever().similarity_search("babylon bread", 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    let reopened = session_with_model(&settings, "c", fake_model(&[]), None).await;
    let results = reopened.retriever().similarity_search("oven", 1).await.unwrap();
    assert_eq!(results[0].0.page_content, "bread baked in a clay oven");
}
