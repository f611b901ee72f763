//! Flat (exact) vector index loaded from a prebuilt file

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

use crate::error::{Error, Result};

const INDEX_FORMAT_VERSION: u32 = 1;

/// Distance metric used to rank stored vectors
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance, lower is closer
    #[default]
    L2,
    /// Dot product, higher is closer
    InnerProduct,
    /// Cosine similarity, higher is closer
    Cosine,
}

impl Metric {
    fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Metric::InnerProduct => dot(a, b),
            Metric::Cosine => cosine_similarity(a, b),
        }
    }

    /// Whether a smaller score ranks first
    pub fn ascending(self) -> bool {
        matches!(self, Metric::L2)
    }
}

/// One search hit: position in the index and its metric score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: usize,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    dimensions: usize,
    metric: Metric,
    vectors: Vec<f32>,
}

/// Read-only, brute-force nearest-neighbour index
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    metric: Metric,
    /// Row-major, `len * dimensions` entries
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from a list of equally sized vectors
    pub fn from_vectors(dimensions: usize, metric: Metric, vectors: &[Vec<f32>]) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::index("Index dimension must be positive"));
        }

        let mut flat = Vec::with_capacity(vectors.len() * dimensions);
        for vector in vectors {
            if vector.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            flat.extend_from_slice(vector);
        }
        check_finite(&flat)?;

        Ok(Self {
            dimensions,
            metric,
            vectors: flat,
        })
    }

    /// Load an index written by [`FlatIndex::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::index(format!("Failed to read index '{}': {}", path.display(), e))
        })?;

        let (file, _): (IndexFile, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| Error::index(format!("Corrupt index '{}': {}", path.display(), e)))?;

        if file.version != INDEX_FORMAT_VERSION {
            return Err(Error::index(format!(
                "Unsupported index version {} (expected {})",
                file.version, INDEX_FORMAT_VERSION
            )));
        }
        if file.dimensions == 0 {
            return Err(Error::index("Index dimension must be positive"));
        }
        if file.vectors.len() % file.dimensions != 0 {
            return Err(Error::index(format!(
                "Vector buffer of {} floats is not a multiple of dimension {}",
                file.vectors.len(),
                file.dimensions
            )));
        }

        check_finite(&file.vectors)?;

        let index = Self {
            dimensions: file.dimensions,
            metric: file.metric,
            vectors: file.vectors,
        };

        tracing::info!(
            "Loaded vector index from {} ({} vectors, {} dims, {:?})",
            path.display(),
            index.len(),
            index.dimensions,
            index.metric
        );

        Ok(index)
    }

    /// Write the index to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = IndexFile {
            version: INDEX_FORMAT_VERSION,
            dimensions: self.dimensions,
            metric: self.metric,
            vectors: self.vectors.clone(),
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())
            .map_err(|e| Error::index(format!("Failed to encode index: {}", e)))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimensions
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Stored vector by id
    pub fn vector(&self, id: usize) -> Option<&[f32]> {
        self.vectors.chunks_exact(self.dimensions).nth(id)
    }

    /// Exact top-k search.
    ///
    /// `k` is clamped to the number of stored vectors, so the result never
    /// holds padding or duplicate ids. Ties keep ascending id order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(id, stored)| SearchHit {
                id,
                score: self.metric.score(query, stored),
            })
            .collect();

        let ascending = self.metric.ascending();
        hits.sort_by(|a, b| rank_order(a, b, ascending));
        hits.truncate(k);

        Ok(hits)
    }
}

/// Best score first, NaN scores last, ties by ascending id
fn rank_order(a: &SearchHit, b: &SearchHit, ascending: bool) -> Ordering {
    let ord = match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => {
            // -0.0 and 0.0 compare equal here, unlike with total_cmp
            let ord = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    };
    ord.then(a.id.cmp(&b.id))
}

fn check_finite(vectors: &[f32]) -> Result<()> {
    match vectors.iter().position(|v| !v.is_finite()) {
        Some(pos) => Err(Error::index(format!(
            "Non-finite value at offset {} in vector data",
            pos
        ))),
        None => Ok(()),
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot(a, b) / (norm_a * norm_b)
    }
}
