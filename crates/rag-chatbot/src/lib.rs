//! rag-chatbot: question answering over a prebuilt vector index
//!
//! A query is embedded, the nearest stored chunks are looked up in a flat
//! vector index, a prompt is assembled from them and the prompt is sent to a
//! local Ollama server. The answer and its source chunks are served through a
//! small web UI and a JSON API.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{RagAnswer, RagContext};
pub use types::{QueryRequest, QueryResponse, RetrievedChunk};
