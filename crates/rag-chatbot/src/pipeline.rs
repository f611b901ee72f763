//! Retrieval-and-generation request flow
//!
//! [`RagContext`] owns everything loaded at startup (index, chunk list,
//! embedder, LLM client). It is immutable once built and is shared by every
//! request handler behind an `Arc`.

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::embeddings::OnnxEmbedder;
use crate::error::{Error, Result};
use crate::generation::{OllamaClient, PromptBuilder};
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaEmbedder, OllamaLlm};
use crate::retrieval::{ChunkStore, FlatIndex};
use crate::types::RetrievedChunk;

/// Generated answer plus the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
}

/// Immutable per-process RAG context
pub struct RagContext {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    index: FlatIndex,
    chunks: ChunkStore,
}

impl RagContext {
    /// Assemble a context from parts, checking that index and chunks line up
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: FlatIndex,
        chunks: ChunkStore,
    ) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(Error::IndexMismatch {
                vectors: index.len(),
                chunks: chunks.len(),
            });
        }
        if embedder.dimensions() != index.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            llm,
            index,
            chunks,
        })
    }

    /// Load index files, the embedding model and the Ollama client from configuration
    pub async fn load(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let index = FlatIndex::load(&config.index.path)?;
        let chunks = ChunkStore::load(&config.index.chunks_path)?;

        let client = Arc::new(OllamaClient::new(&config.llm)?);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::new(&config.embeddings).await?),
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::from_client(
                Arc::clone(&client),
                config.embeddings.dimensions,
            )),
        };
        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::from_client(client));

        tracing::info!(
            "RAG context ready: {} chunks, embedder {}, model {}",
            chunks.len(),
            embedder.name(),
            llm.model()
        );

        Self::new(embedder, llm, index, chunks)
    }

    /// Embed the query and return up to `top_k` chunks in rank order.
    ///
    /// `top_k` is clamped to the number of stored chunks.
    pub async fn retrieve_chunks(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.search(&vector, top_k)?;

        tracing::debug!("Retrieved {} of {} requested chunks", hits.len(), top_k);

        hits.into_iter()
            .enumerate()
            .map(|(i, hit)| {
                let content = self.chunks.get(hit.id).ok_or_else(|| {
                    Error::internal(format!("Index returned out-of-range id {}", hit.id))
                })?;
                Ok(RetrievedChunk {
                    rank: i + 1,
                    id: hit.id,
                    content: content.to_string(),
                    score: hit.score,
                })
            })
            .collect()
    }

    /// Retrieve, build the prompt and ask the LLM
    pub async fn answer(&self, query: &str, top_k: usize) -> Result<RagAnswer> {
        let sources = self.retrieve_chunks(query, top_k).await?;

        let texts: Vec<&str> = sources.iter().map(|c| c.content.as_str()).collect();
        let prompt = PromptBuilder::build_prompt(&texts, query);

        let answer = self.llm.generate(&prompt).await?;

        Ok(RagAnswer { answer, sources })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }
}
