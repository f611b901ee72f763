//! Ollama HTTP client with retry logic

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client with automatic retry
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

/// Outcome of a failed request attempt
enum Attempt {
    /// Connection failure or 5xx, worth retrying
    Transient(Error),
    /// Any other failure; retrying would give the same answer
    Fatal(Error),
}

impl Attempt {
    fn from_status(status: reqwest::StatusCode, error: Error) -> Self {
        if status.is_server_error() {
            Attempt::Transient(error)
        } else {
            Attempt::Fatal(error)
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Retry a request with exponential backoff.
    ///
    /// Only [`Attempt::Transient`] failures are retried.
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, Attempt>>,
    {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(Attempt::Transient(e)) if attempt < max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(Attempt::Transient(e)) | Err(Attempt::Fatal(e)) => return Err(e),
            }
        }
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Embed text with the configured Ollama embedding model
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("/api/embeddings");
        let request = EmbedRequest {
            model: &self.config.embed_model,
            prompt: text,
        };

        let client = &self.client;
        let url = url.as_str();
        let request = &request;

        self.retry_request(|| async move {
            let response = client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    Attempt::Transient(Error::embedding(format!(
                        "Embedding request failed: {}",
                        e
                    )))
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(Attempt::from_status(
                    status,
                    Error::embedding(format!("Embedding failed: HTTP {}", status)),
                ));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Attempt::Fatal(Error::embedding(format!(
                    "Failed to parse embedding response: {}",
                    e
                )))
            })?;

            Ok::<_, Attempt>(embed_response.embedding)
        })
        .await
    }

    /// Send a prompt to `/api/generate` (non-streaming) and return the `response` field
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.url("/api/generate");
        let request = GenerateRequest {
            model: &self.config.generate_model,
            prompt,
            stream: false,
            options: self
                .config
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        };

        tracing::info!(
            "Generating answer with model: {} ({} prompt chars)",
            self.config.generate_model,
            prompt.len()
        );

        let client = &self.client;
        let url = url.as_str();
        let request = &request;

        self.retry_request(|| async move {
            let response = client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    Attempt::Transient(Error::llm(format!("Generation request failed: {}", e)))
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Attempt::from_status(
                    status,
                    Error::llm(format!("Generation failed: HTTP {} - {}", status, body)),
                ));
            }

            let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                Attempt::Fatal(Error::llm(format!(
                    "Failed to parse generation response: {}",
                    e
                )))
            })?;

            Ok::<_, Attempt>(generate_response.response)
        })
        .await
    }
}
