//! Query endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::config::EmbeddingBackend;
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{InfoResponse, QueryRequest, QueryResponse, RetrieveResponse};

/// POST /api/query - Answer a question from the indexed documents
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    request.validate()?;
    let start = Instant::now();
    let top_k = request.top_k.unwrap_or_else(|| state.default_top_k());

    tracing::info!("Query: \"{}\" (top_k={})", request.question, top_k);

    let result = state.context().answer(&request.question, top_k).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Query completed in {}ms, {} source chunks",
        processing_time_ms,
        result.sources.len()
    );

    Ok(Json(QueryResponse {
        answer: result.answer,
        sources: result.sources,
        model: state.context().llm().model().to_string(),
        processing_time_ms,
    }))
}

/// POST /api/retrieve - Return the nearest chunks without generating an answer
pub async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RetrieveResponse>> {
    request.validate()?;
    let start = Instant::now();
    let top_k = request.top_k.unwrap_or_else(|| state.default_top_k());

    let sources = state
        .context()
        .retrieve_chunks(&request.question, top_k)
        .await?;

    Ok(Json(RetrieveResponse {
        sources,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// GET /api/info - Sidebar details
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let context = state.context();
    let config = state.config();
    let embedding_model = match config.embeddings.backend {
        EmbeddingBackend::Onnx => &config.embeddings.model,
        EmbeddingBackend::Ollama => &config.llm.embed_model,
    };

    Json(InfoResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: context.llm().model().to_string(),
        embedding_model: format!("{} ({})", embedding_model, context.embedder().name()),
        chunks: context.chunk_count(),
        top_k: state.default_top_k(),
    })
}
