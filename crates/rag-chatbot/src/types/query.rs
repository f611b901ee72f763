//! Query request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Question submitted by the UI or an API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve; the configured default when absent
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Questions made only of whitespace are never submitted
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }
        Ok(())
    }
}
