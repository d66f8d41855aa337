//! On-disk snapshot of a built index: vectors plus parallel chunk metadata.
//!
//! A snapshot is reused only when its `corpus_hash` and `embedder_id` match
//! the current chunk set; otherwise the caller re-embeds and rebuilds.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use talentrag_core::error::{Error, Result};
use talentrag_core::types::{Chunk, IndexEntry};

use crate::index::VectorIndex;
use crate::persist::{read_json, write_json_atomic};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMeta {
    pub chunk_id: String,
    pub source_name: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub corpus_hash: String,
    pub embedder_id: String,
    pub dim: usize,
    pub built_at: i64,
    pub chunks: Vec<ChunkMeta>,
    pub vectors: Vec<Vec<f32>>,
}

/// Digest over `(source_name, ordinal, text)` of every chunk, in order.
pub fn corpus_hash<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Chunk)>,
{
    let mut hasher = blake3::Hasher::new();
    for (source_name, chunk) in chunks {
        hasher.update(source_name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(chunk.ordinal as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
        hasher.update(&[0xff]);
    }
    hasher.finalize().to_hex().to_string()
}

impl IndexSnapshot {
    pub fn new(corpus_hash: String, embedder_id: String, chunks: Vec<ChunkMeta>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::InvalidInput(format!("{} chunks but {} vectors", chunks.len(), vectors.len())));
        }
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        Ok(Self { corpus_hash, embedder_id, dim, built_at: Utc::now().timestamp_millis(), chunks, vectors })
    }

    /// Loads a snapshot, treating a missing or malformed file as absent.
    pub fn load(path: &Path) -> Option<Self> {
        match read_json::<Self>(path) {
            Ok(Some(snap)) if snap.chunks.len() == snap.vectors.len() => Some(snap),
            Ok(Some(_)) => {
                tracing::warn!(path = %path.display(), "index snapshot has mismatched arrays, ignoring");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable index snapshot, ignoring");
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        tracing::info!(path = %path.display(), vectors = self.vectors.len(), "index snapshot saved");
        Ok(())
    }

    pub fn matches(&self, corpus_hash: &str, embedder_id: &str) -> bool {
        self.corpus_hash == corpus_hash && self.embedder_id == embedder_id
    }

    pub fn to_index(&self) -> Result<VectorIndex> {
        VectorIndex::build(
            self.chunks
                .iter()
                .zip(&self.vectors)
                .map(|(m, v)| IndexEntry { chunk_id: m.chunk_id.clone(), vector: v.clone() })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(doc: &str, ordinal: usize, text: &str) -> Chunk {
        Chunk { id: Chunk::make_id(doc, ordinal), document_id: doc.into(), ordinal, text: text.into(), word_count: 1 }
    }

    #[test]
    fn corpus_hash_tracks_content_and_order() {
        let a = chunk("d", 0, "alpha");
        let b = chunk("d", 1, "beta");
        let h1 = corpus_hash([("d.txt", &a), ("d.txt", &b)]);
        let h2 = corpus_hash([("d.txt", &a), ("d.txt", &b)]);
        let swapped = corpus_hash([("d.txt", &b), ("d.txt", &a)]);
        let renamed = corpus_hash([("e.txt", &a), ("e.txt", &b)]);
        assert_eq!(h1, h2);
        assert_ne!(h1, swapped);
        assert_ne!(h1, renamed);
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let meta = vec![ChunkMeta { chunk_id: "d:0".into(), source_name: "d.txt".into(), ordinal: 0 }];
        assert!(IndexSnapshot::new("h".into(), "e".into(), meta, vec![]).is_err());
    }
}
