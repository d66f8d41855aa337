//! Embedding cache, exact vector index and their on-disk snapshots.

pub mod cache;
pub mod embed_provider;
pub mod index;
pub mod persist;
pub mod snapshot;

pub use cache::{content_hash, CacheRecord, EmbeddingCache};
pub use embed_provider::{BatchEmbedder, EmbedOutcome};
pub use index::VectorIndex;
pub use snapshot::{corpus_hash, ChunkMeta, IndexSnapshot};
