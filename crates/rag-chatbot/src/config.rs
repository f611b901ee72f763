//! Configuration for the RAG chatbot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Query embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Prebuilt index files
    pub index: IndexConfig,
    /// Retrieval defaults
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; missing sections fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later at request time
    pub fn validate(&self) -> Result<()> {
        if self.llm.generate_model.trim().is_empty() {
            return Err(Error::Config("llm.generate_model must not be empty".to_string()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(Error::Config("llm.base_url must not be empty".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            enable_cors: true,
        }
    }
}

/// Which backend turns queries into vectors
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local sentence-transformer through ONNX Runtime
    #[default]
    Onnx,
    /// Ollama `/api/embeddings`
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend
    pub backend: EmbeddingBackend,
    /// Sentence-transformer model (default: all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Maximum sequence length in tokens
    pub max_length: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Cache directory for model and tokenizer files
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            max_length: 256,
            batch_size: 32,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rag-chatbot")
                .join("models"),
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding model name (only used with the ollama embedding backend)
    pub embed_model: String,
    /// Sampling temperature; omitted from requests when unset
    pub temperature: Option<f32>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "mistral".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            temperature: None,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Locations of the prebuilt vector index and its chunk list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Vector index file
    pub path: PathBuf,
    /// JSON array of chunk strings, parallel to the index
    pub chunks_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vector_index.bin"),
            chunks_path: PathBuf::from("document_chunks.json"),
        }
    }
}

/// Retrieval defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per query when the request does not say
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.generate_model, "mistral");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Onnx);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml_str(
            r#"
            [llm]
            base_url = "http://gpu-box:11434"
            generate_model = "llama3.2"
            temperature = 0.2

            [embeddings]
            backend = "ollama"

            [index]
            path = "/data/index.bin"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.generate_model, "llama3.2");
        assert_eq!(config.llm.temperature, Some(0.2));
        assert_eq!(config.llm.max_retries, 2);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Ollama);
        assert_eq!(config.index.path, PathBuf::from("/data/index.bin"));
        assert_eq!(config.index.chunks_path, PathBuf::from("document_chunks.json"));
        assert_eq!(config.server.port, 8501);
    }

    #[test]
    fn test_rejects_empty_model() {
        let err = RagConfig::from_toml_str("[llm]\ngenerate_model = \"\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
