//! HTTP API tests against the in-memory router

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{build_context, llm_config, refused_url, FakeOllama, HashEmbedder, CHUNKS, DIMS};
use rag_chatbot::config::RagConfig;
use rag_chatbot::providers::OllamaLlm;
use rag_chatbot::retrieval::{ChunkStore, FlatIndex, Metric};
use rag_chatbot::server::RagServer;
use rag_chatbot::RagContext;

async fn router(base_url: &str) -> Router {
    let mut config = RagConfig::default();
    config.llm.base_url = base_url.to_string();
    let context = build_context(CHUNKS, base_url).await;
    RagServer::new(config, context).router()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_query_returns_answer_and_sources() {
    let ollama = FakeOllama::answering("Rust is memory safe.").await;
    let app = router(&ollama.base_url).await;

    let response = app
        .oneshot(post_json("/api/query", json!({ "question": "Is Rust memory safe?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["answer"], "Rust is memory safe.");
    assert_eq!(body["model"], "mistral");

    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0]["rank"], 1);
    assert_eq!(sources[2]["rank"], 3);
}

#[tokio::test]
async fn test_query_with_blank_question_is_bad_request() {
    let app = router(&refused_url()).await;

    let response = app
        .oneshot(post_json("/api/query", json!({ "question": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_request");
}

#[tokio::test]
async fn test_query_with_negative_top_k_is_rejected() {
    let app = router(&refused_url()).await;

    let response = app
        .oneshot(post_json(
            "/api/query",
            json!({ "question": "What is Rust?", "top_k": -1 }),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_query_when_ollama_is_down() {
    let app = router(&refused_url()).await;

    let response = app
        .oneshot(post_json("/api/query", json!({ "question": "What is Rust?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(response).await;
    assert_eq!(body["error"]["type"], "llm_error");
}

#[tokio::test]
async fn test_retrieve_clamps_top_k() {
    let app = router(&refused_url()).await;

    let response = app
        .oneshot(post_json(
            "/api/retrieve",
            json!({ "question": "borrow checker", "top_k": 10 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["sources"].as_array().unwrap().len(), CHUNKS.len());
}

#[tokio::test]
async fn test_info_reports_model_and_chunk_count() {
    let app = router(&refused_url()).await;

    let response = app.oneshot(get("/api/info")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["model"], "mistral");
    assert_eq!(body["chunks"], CHUNKS.len());
    assert_eq!(body["top_k"], 3);
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = router(&refused_url()).await;

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Source Chunks Used"));
    assert!(html.contains("Reset Chat"));
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = router(&refused_url()).await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_not_ready_with_empty_index() {
    let base_url = refused_url();
    let index = FlatIndex::from_vectors(DIMS, Metric::L2, &[]).unwrap();
    let llm = Arc::new(OllamaLlm::new(&llm_config(&base_url)).unwrap());
    let context =
        RagContext::new(Arc::new(HashEmbedder), llm, index, ChunkStore::new(Vec::new())).unwrap();
    let app = RagServer::new(RagConfig::default(), context).router();

    let response = app.oneshot(get("/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
