//! Response types for RAG queries

use serde::{Deserialize, Serialize};

/// A chunk returned by retrieval, in rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// 1-based rank
    pub rank: usize,
    /// Position in the index and chunk list
    pub id: usize,
    /// Chunk text
    pub content: String,
    /// Metric score: distance for `l2`, similarity otherwise
    pub score: f32,
}

/// Response from `/api/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was grounded on
    pub sources: Vec<RetrievedChunk>,
    /// Generation model
    pub model: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Response from `/api/retrieve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub sources: Vec<RetrievedChunk>,
    pub processing_time_ms: u64,
}

/// Sidebar information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub model: String,
    pub embedding_model: String,
    pub chunks: usize,
    pub top_k: usize,
}
