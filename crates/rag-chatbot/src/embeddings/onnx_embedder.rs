//! ONNX-based query embedding
//!
//! Runs a sentence-transformer (all-MiniLM-L6-v2 by default) locally and
//! produces mean-pooled, L2-normalised vectors. Model and tokenizer files are
//! cached on disk and fetched from the Hugging Face hub on first use.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

/// ONNX Runtime session plus its tokenizer
struct OnnxSession {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
    dimensions: usize,
}

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    inner: Arc<Mutex<OnnxSession>>,
    dimensions: usize,
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Load the model, downloading it into the cache directory if needed.
    ///
    /// Any failure here is reported as [`Error::ModelLoad`].
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        tokio::fs::create_dir_all(&config.cache_dir).await.map_err(|e| {
            Error::ModelLoad(format!(
                "Failed to create cache directory '{}': {}",
                config.cache_dir.display(),
                e
            ))
        })?;

        let model_path = config.cache_dir.join(format!("{}.onnx", config.model));
        let tokenizer_path = config.cache_dir.join(format!("{}.tokenizer.json", config.model));

        if !model_path.exists() {
            download_file(&hub_url(&config.model, "onnx/model.onnx"), &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download_file(&hub_url(&config.model, "tokenizer.json"), &tokenizer_path).await?;
        }

        let embedder = Self::from_files(config, &model_path, &tokenizer_path)?;
        tracing::info!("ONNX embedder initialized successfully");
        Ok(embedder)
    }

    /// Load from explicit model and tokenizer files
    pub fn from_files(
        config: &EmbeddingConfig,
        model_path: &Path,
        tokenizer_path: &Path,
    ) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| Error::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::ModelLoad(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::ModelLoad(format!("Failed to set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| {
                Error::ModelLoad(format!(
                    "Failed to load model '{}': {}",
                    model_path.display(),
                    e
                ))
            })?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| Error::ModelLoad(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Mutex::new(OnnxSession {
                session,
                tokenizer,
                max_length: config.max_length,
                dimensions: config.dimensions,
            })),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn run_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut session = inner.lock();
            let mut all_embeddings = Vec::with_capacity(texts.len());
            for batch in texts.chunks(batch_size) {
                let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
                all_embeddings.extend(session.embed_batch(&refs)?);
            }
            Ok(all_embeddings)
        })
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

impl OnnxSession {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::embedding(format!("Input tensor creation failed: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| {
                    Error::embedding(format!("Attention mask tensor creation failed: {}", e))
                })?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice())).map_err(|e| {
                Error::embedding(format!("Token type tensor creation failed: {}", e))
            })?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::embedding(format!("Inference failed: {}", e)))?;

        // last_hidden_state: [batch, seq, hidden]
        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::embedding("No output tensor"))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims.get(2).copied().unwrap_or(self.dimensions);

        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mask = &attention_mask[i * max_len..(i + 1) * max_len];
            embeddings.push(mean_pool(tensor_data, i, max_len, hidden_size, mask));
        }

        Ok(embeddings)
    }
}

/// Masked mean over the sequence axis followed by L2 normalisation
fn mean_pool(
    hidden: &[f32],
    row: usize,
    seq_len: usize,
    hidden_size: usize,
    mask: &[i64],
) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (j, &m) in mask.iter().enumerate().take(seq_len) {
        if m == 0 {
            continue;
        }
        let offset = row * seq_len * hidden_size + j * hidden_size;
        if let Some(token) = hidden.get(offset..offset + hidden_size) {
            for (acc, value) in sum.iter_mut().zip(token) {
                *acc += value;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for val in &mut sum {
            *val /= count;
        }
    }

    let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut sum {
            *val /= norm;
        }
    }

    sum
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run_blocking(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run_blocking(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

fn hub_url(model_name: &str, file: &str) -> String {
    format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, file
    )
}

async fn download_file(url: &str, path: &Path) -> Result<()> {
    tracing::info!("Downloading {} -> {}", url, path.display());

    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::ModelLoad(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::ModelLoad(format!(
            "Download of {} failed: HTTP {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::ModelLoad(format!("Failed to read {}: {}", url, e)))?;

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| Error::ModelLoad(format!("Failed to save {}: {}", path.display(), e)))?;

    tracing::info!("Downloaded {} bytes", bytes.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // one row, three positions, hidden size 2; last position is padding
        let hidden = [1.0, 0.0, 3.0, 0.0, 100.0, 100.0];
        let pooled = mean_pool(&hidden, 0, 3, 2, &[1, 1, 0]);
        assert_eq!(pooled, vec![1.0, 0.0]);
    }

    #[test]
    fn test_mean_pool_second_row() {
        let hidden = [9.0, 9.0, 0.0, 2.0, 0.0, 4.0];
        let pooled = mean_pool(&hidden, 1, 2, 2, &[1, 0]);
        // row 1 starts at offset 4: [0.0, 4.0] normalised
        assert_eq!(pooled, vec![0.0, 1.0]);
    }

    #[test]
    fn test_hub_url() {
        assert_eq!(
            hub_url("all-MiniLM-L6-v2", "tokenizer.json"),
            "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json"
        );
    }

    #[test]
    fn test_missing_model_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmbeddingConfig {
            cache_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = OnnxEmbedder::from_files(
            &config,
            &dir.path().join("missing.onnx"),
            &dir.path().join("missing.json"),
        );
        assert!(matches!(result, Err(Error::ModelLoad(_))));
    }
}
