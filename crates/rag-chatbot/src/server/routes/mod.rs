//! API routes for the RAG chatbot

pub mod query;
pub mod ui;

use axum::{
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::query_rag))
        .route("/retrieve", post(query::retrieve))
        .route("/info", get(query::info))
}
