//! Chunk list parallel to the vector index

use std::path::Path;

use crate::error::{Error, Result};

/// Ordered chunk texts; position `i` belongs to vector id `i`
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<String>,
}

impl ChunkStore {
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    /// Load a JSON array of strings
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::index(format!("Failed to read chunks '{}': {}", path.display(), e))
        })?;
        let chunks: Vec<String> = serde_json::from_str(&raw)?;

        tracing::info!("Loaded {} chunks from {}", chunks.len(), path.display());

        Ok(Self { chunks })
    }

    /// Write the chunk list as a JSON array
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.chunks)?)?;
        Ok(())
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.chunks.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
