//! Shared fixtures: a deterministic embedder and a fake Ollama server

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rag_chatbot::config::LlmConfig;
use rag_chatbot::providers::{EmbeddingProvider, LlmProvider, OllamaLlm};
use rag_chatbot::retrieval::{ChunkStore, FlatIndex, Metric};
use rag_chatbot::{RagContext, Result};

pub const DIMS: usize = 64;

pub const CHUNKS: &[&str] = &[
    "Rust is a systems programming language focused on memory safety.",
    "Ollama runs large language models on your own machine.",
    "Paris is the capital and largest city of France.",
    "The borrow checker enforces ownership rules at compile time.",
];

/// Bag-of-words hashing embedder; identical text gives identical vectors
pub struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIMS as u64) as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Index built from `chunks` with the hashing embedder
pub async fn build_index(chunks: &[&str]) -> FlatIndex {
    let texts: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
    let vectors = HashEmbedder.embed_batch(&texts).await.unwrap();
    FlatIndex::from_vectors(DIMS, Metric::L2, &vectors).unwrap()
}

pub fn llm_config(base_url: &str) -> LlmConfig {
    LlmConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        max_retries: 0,
        ..Default::default()
    }
}

pub async fn build_context(chunks: &[&str], base_url: &str) -> RagContext {
    let index = build_index(chunks).await;
    let store = ChunkStore::new(chunks.iter().map(|c| c.to_string()).collect());
    let llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::new(&llm_config(base_url)).unwrap());
    RagContext::new(Arc::new(HashEmbedder), llm, index, store).unwrap()
}

/// Address on which nothing is listening
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// In-process stand-in for the Ollama HTTP API
pub struct FakeOllama {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeOllama {
    /// `/api/generate` answers with `status` and `body`; `/api/embeddings` with `embedding`
    pub async fn spawn(status: StatusCode, body: Value, embedding: Vec<f32>) -> Self {
        Self::start(0, status, body, embedding).await
    }

    /// Fails the first `failures` generate calls with HTTP 503, then answers normally
    pub async fn failing_first(failures: usize, answer: &str) -> Self {
        Self::start(failures, StatusCode::OK, generate_body(answer), vec![1.0, 0.0, 0.0]).await
    }

    /// Fake that answers every prompt with `answer`
    pub async fn answering(answer: &str) -> Self {
        Self::spawn(StatusCode::OK, generate_body(answer), vec![1.0, 0.0, 0.0]).await
    }

    async fn start(failures: usize, status: StatusCode, body: Value, embedding: Vec<f32>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let app = Router::new()
            .route(
                "/api/generate",
                post(move |Json(request): Json<Value>| async move {
                    let seen = {
                        let mut recorded = recorded.lock();
                        recorded.push(request);
                        recorded.len()
                    };
                    if seen <= failures {
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({ "error": "model is loading" })),
                        )
                    } else {
                        (status, Json(body))
                    }
                }),
            )
            .route(
                "/api/embeddings",
                post(move || async move { Json(json!({ "embedding": embedding })) }),
            )
            .route("/api/tags", get(|| async { Json(json!({ "models": [] })) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn last_request(&self) -> Option<Value> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

fn generate_body(answer: &str) -> Value {
    json!({ "model": "mistral", "response": answer, "done": true })
}
