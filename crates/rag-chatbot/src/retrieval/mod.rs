//! Vector search over the prebuilt index

pub mod chunks;
pub mod index;

pub use chunks::ChunkStore;
pub use index::{cosine_similarity, FlatIndex, Metric, SearchHit};
