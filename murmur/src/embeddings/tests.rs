//! Remote embedding backend and provider selection.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::embeddings::api::RemoteEmbedder;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::error::MurmurError;
use crate::social::RetryPolicy;

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

fn embedder(server: &MockServer, max_attempts: u32) -> RemoteEmbedder {
    RemoteEmbedder::new(
        &format!("{}/v1/", server.uri()),
        Some("mem-key".to_string()),
        "text-embedding-3-small",
        Duration::from_secs(5),
        quick_retry(max_attempts),
    )
    .unwrap()
}

fn vector(values: &[f32]) -> serde_json::Value {
    json!({ "data": [{ "embedding": values }] })
}

#[tokio::test]
async fn test_memory_text_is_sent_as_single_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer mem-key"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": ["I liked a post about tide pools"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector(&[0.25, 0.5, 0.75])))
        .expect(1)
        .mount(&server)
        .await;

    let embedding = embedder(&server, 1)
        .embed_one("I liked a post about tide pools")
        .await
        .unwrap();
    assert_eq!(embedding, vec![0.25, 0.5, 0.75]);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector(&[1.0, 0.0, 0.0])))
        .mount(&server)
        .await;

    let embedding = embedder(&server, 3).embed_one("busy").await.unwrap();
    assert_eq!(embedding, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_server_errors_exhaust_the_policy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream gone"))
        .expect(2)
        .mount(&server)
        .await;

    let err = embedder(&server, 2).embed_one("lost").await.unwrap_err();
    assert!(matches!(err, MurmurError::Embedding(msg) if msg.contains("upstream gone")));
}

#[tokio::test]
async fn test_client_errors_fail_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = embedder(&server, 4).embed_one("x").await.unwrap_err();
    assert!(matches!(err, MurmurError::Embedding(msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_empty_data_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = embedder(&server, 1).embed_one("nothing").await.unwrap_err();
    assert!(matches!(err, MurmurError::Embedding(_)));
}

#[tokio::test]
async fn test_provider_rejects_wrong_dimensions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector(&[0.5, 0.5])))
        .mount(&server)
        .await;

    let provider = EmbeddingProvider::new(&EmbeddingsConfig {
        model: "openai/text-embedding-3-small".to_string(),
        dimensions: 3,
        batch_size: 8,
        api_key: Some("k".to_string()),
        base_url: Some(server.uri()),
    })
    .unwrap();

    assert_eq!(provider.dimensions(), 3);
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, MurmurError::Embedding(msg) if msg.contains("expected 3")));
}

#[test]
fn test_provider_prefix_selects_backend() {
    assert_eq!(
        parse_provider_model("openai/text-embedding-3-small"),
        ("openai", "text-embedding-3-small")
    );
    assert_eq!(
        parse_provider_model("BAAI/bge-small-en-v1.5"),
        ("local", "BAAI/bge-small-en-v1.5")
    );
}
