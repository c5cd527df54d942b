use agent_chain::OpenAIEmbeddings;
use agent_chain_core::{Embeddings, Error};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_embed_documents_orders_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({
            "model": "BAAI/bge-small-en-v1.5",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embeddings = OpenAIEmbeddings::new("BAAI/bge-small-en-v1.5").api_base(server.uri());
    let vectors = embeddings
        .embed_documents(vec!["first".into(), "second".into()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_embed_query_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let embeddings = OpenAIEmbeddings::new("missing").api_base(server.uri());
    let err = embeddings.embed_query("q").await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_empty_input_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let embeddings = OpenAIEmbeddings::new("m").api_base(server.uri());
    assert!(embeddings.embed_documents(vec![]).await.unwrap().is_empty());
}
