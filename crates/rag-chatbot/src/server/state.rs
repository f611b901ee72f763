//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::pipeline::RagContext;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Loaded index, chunks, embedder and LLM
    context: RagContext,
}

impl AppState {
    /// Wrap a fully loaded context
    pub fn new(config: RagConfig, context: RagContext) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, context }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the RAG context
    pub fn context(&self) -> &RagContext {
        &self.inner.context
    }

    /// Default number of chunks per query
    pub fn default_top_k(&self) -> usize {
        self.inner.config.retrieval.top_k
    }
}
