//! Provider abstractions for query embedding and answer generation
//!
//! The pipeline only talks to these traits, so the ONNX embedder, the
//! Ollama backends and test doubles are interchangeable.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};
