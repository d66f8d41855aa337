//! Exact nearest-neighbour index over chunk vectors.
//!
//! Brute-force squared Euclidean scan. Corpora here are tens to low thousands
//! of chunks, so a linear pass per query is cheap and results are exact and
//! reproducible. The index is immutable; new documents mean a full rebuild.

use talentrag_core::error::{Error, Result};
use talentrag_core::types::{ChunkId, IndexEntry, SearchHit};

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dim: usize,
    chunk_ids: Vec<ChunkId>,
    /// Row-major, `chunk_ids.len() * dim` floats.
    data: Vec<f32>,
}

impl VectorIndex {
    /// Builds from entries in order. All vectors must share one dimension.
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self> {
        let dim = entries.first().map(|e| e.vector.len()).unwrap_or(0);
        if dim == 0 && !entries.is_empty() {
            return Err(Error::InvalidInput("cannot index zero-length vectors".into()));
        }
        let mut chunk_ids = Vec::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len() * dim);
        for entry in entries {
            if entry.vector.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: entry.vector.len() });
            }
            chunk_ids.push(entry.chunk_id);
            data.extend_from_slice(&entry.vector);
        }
        tracing::debug!(vectors = chunk_ids.len(), dim, "vector index built");
        Ok(Self { dim, chunk_ids, data })
    }

    pub fn len(&self) -> usize { self.chunk_ids.len() }
    pub fn is_empty(&self) -> bool { self.chunk_ids.is_empty() }
    pub fn dim(&self) -> usize { self.dim }

    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // chunks_exact(0) panics, and an empty index has no rows anyway.
        self.data.chunks_exact(self.dim.max(1)).take(self.chunk_ids.len())
    }

    /// The `min(k, len)` closest entries by squared Euclidean distance, in
    /// non-decreasing distance order. Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(Error::IndexNotReady);
        }
        if k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".into()));
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit { chunk_id: self.chunk_ids[i].clone(), distance })
            .collect())
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity in `[-1, 1]`; 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0)
}
