//! Cache-aware batch embedding.
//!
//! For a list of texts: consult the cache, embed the distinct misses in
//! batches spread over a bounded worker pool, check every vector's dimension,
//! add the new vectors to the cache with a single flush, and return
//! vectors in input order. Cancellation is checked before each batch.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use talentrag_core::cancel::CancelFlag;
use talentrag_core::error::{Error, ProviderErrorKind, Result};
use talentrag_core::traits::Embedder;

use crate::cache::{content_hash, EmbeddingCache};

#[derive(Debug, Default)]
pub struct EmbedOutcome {
    pub vectors: Vec<Vec<f32>>,
    pub cache_hits: usize,
    pub computed: usize,
}

pub struct BatchEmbedder {
    batch_size: usize,
    pool: rayon::ThreadPool,
}

impl BatchEmbedder {
    pub fn new(batch_size: usize, workers: usize) -> Result<Self> {
        if batch_size == 0 || workers == 0 {
            return Err(Error::InvalidInput("batch_size and workers must be at least 1".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("embed-{i}"))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to start embedding workers: {e}")))?;
        Ok(Self { batch_size, pool })
    }

    pub fn embed_all(
        &self,
        provider: &dyn Embedder,
        cache: &EmbeddingCache,
        texts: &[String],
        cancel: &CancelFlag,
    ) -> Result<EmbedOutcome> {
        let hashes: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();

        let mut found: HashMap<String, Vec<f32>> = HashMap::new();
        let mut misses: Vec<(String, String)> = Vec::new();
        let mut pending: HashSet<&str> = HashSet::new();
        for (text, hash) in texts.iter().zip(&hashes) {
            if found.contains_key(hash) || pending.contains(hash.as_str()) {
                continue;
            }
            match cache.get_by_hash(hash) {
                Some(v) => { found.insert(hash.clone(), v); }
                None => {
                    pending.insert(hash.as_str());
                    misses.push((hash.clone(), text.clone()));
                }
            }
        }
        let cache_hits = found.len();
        tracing::info!(texts = texts.len(), cache_hits, misses = misses.len(), "embedding texts");

        let computed = misses.len();
        if !misses.is_empty() {
            let batches: Vec<Vec<(String, String)>> = misses.chunks(self.batch_size).map(<[_]>::to_vec).collect();
            let embedded: Vec<Vec<(String, Vec<f32>)>> = self.pool.install(|| {
                batches
                    .par_iter()
                    .map(|batch| embed_batch_checked(provider, batch, cancel))
                    .collect::<Result<Vec<_>>>()
            })?;
            let fresh: Vec<(String, Vec<f32>)> = embedded.into_iter().flatten().collect();
            cache.put_many(fresh.iter().cloned())?;
            cache.flush()?;
            found.extend(fresh);
        }

        let vectors = hashes
            .iter()
            .map(|h| {
                found.get(h).cloned().ok_or_else(|| {
                    Error::provider(ProviderErrorKind::InvalidResponse, "missing vector after embedding")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(EmbedOutcome { vectors, cache_hits, computed })
    }
}

fn embed_batch_checked(
    provider: &dyn Embedder,
    batch: &[(String, String)],
    cancel: &CancelFlag,
) -> Result<Vec<(String, Vec<f32>)>> {
    cancel.check()?;
    let texts: Vec<String> = batch.iter().map(|(_, t)| t.clone()).collect();
    let vectors = provider.embed_batch(&texts)?;
    if vectors.len() != texts.len() {
        return Err(Error::provider(
            ProviderErrorKind::InvalidResponse,
            format!("embedder returned {} vectors for {} texts", vectors.len(), texts.len()),
        ));
    }
    let dim = provider.dim();
    for v in &vectors {
        if v.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
        }
    }
    Ok(batch.iter().map(|(h, _)| h.clone()).zip(vectors).collect())
}
