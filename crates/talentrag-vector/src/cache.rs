//! Embedding cache keyed by a blake3 digest of the exact text.
//!
//! The cache is consulted before calling a provider and written through on
//! misses. The whole store is one JSON file, reloaded wholesale on open and
//! rewritten atomically by `flush` when something changed, tagged with the `embedder_id` that
//! produced it so a model swap never serves stale vectors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use talentrag_core::error::Result;

use crate::persist::{read_json, write_json_atomic};

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheRecord {
    pub content_hash: String,
    pub vector: Vec<f32>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    embedder_id: String,
    records: Vec<CacheRecord>,
}

#[derive(Debug)]
pub struct EmbeddingCache {
    path: Option<PathBuf>,
    embedder_id: String,
    entries: RwLock<HashMap<String, CacheRecord>>,
    dirty: AtomicBool,
    flush_lock: Mutex<()>,
}

impl EmbeddingCache {
    /// A cache that never touches disk.
    pub fn in_memory(embedder_id: impl Into<String>) -> Self {
        Self {
            path: None,
            embedder_id: embedder_id.into(),
            entries: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        }
    }

    /// Loads the cache file at `path` if present. A file written by another
    /// embedder, or one that cannot be parsed, is ignored and replaced on the
    /// next write.
    pub fn open(path: impl AsRef<Path>, embedder_id: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let embedder_id = embedder_id.into();
        let mut entries = HashMap::new();
        match read_json::<CacheFile>(&path) {
            Ok(Some(file)) if file.embedder_id == embedder_id => {
                entries.extend(file.records.into_iter().map(|r| (r.content_hash.clone(), r)));
                tracing::info!(path = %path.display(), records = entries.len(), "embedding cache loaded");
            }
            Ok(Some(file)) => {
                tracing::warn!(path = %path.display(), found = %file.embedder_id, expected = %embedder_id, "cache belongs to another embedder, starting empty");
            }
            Ok(None) => tracing::debug!(path = %path.display(), "no embedding cache yet"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "unreadable embedding cache, starting empty"),
        }
        Ok(Self {
            path: Some(path),
            embedder_id,
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn len(&self) -> usize { self.entries.read().len() }
    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.get_by_hash(&content_hash(text))
    }

    pub fn get_by_hash(&self, hash: &str) -> Option<Vec<f32>> {
        self.entries.read().get(hash).map(|r| r.vector.clone())
    }

    pub fn put(&self, text: &str, vector: Vec<f32>) -> Result<()> {
        self.put_many([(content_hash(text), vector)])?;
        Ok(())
    }

    /// Inserts `(content_hash, vector)` pairs. The first writer of a hash
    /// wins; returns how many entries were new. Nothing reaches disk until
    /// [`EmbeddingCache::flush`].
    pub fn put_many<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let now = Utc::now().timestamp_millis();
        let inserted = {
            let mut entries = self.entries.write();
            let mut n = 0;
            for (hash, vector) in items {
                entries.entry(hash.clone()).or_insert_with(|| {
                    n += 1;
                    CacheRecord { content_hash: hash, vector, created_at: now }
                });
            }
            n
        };
        if inserted > 0 {
            self.dirty.store(true, Ordering::SeqCst);
        }
        Ok(inserted)
    }

    /// Returns the cached vector or computes, stores and returns it.
    pub fn get_or_insert_with<F>(&self, text: &str, compute: F) -> Result<Vec<f32>>
    where
        F: FnOnce(&str) -> Result<Vec<f32>>,
    {
        let hash = content_hash(text);
        if let Some(v) = self.get_by_hash(&hash) {
            return Ok(v);
        }
        let vector = compute(text)?;
        self.put_many([(hash.clone(), vector)])?;
        // Another thread may have inserted first; hand back the stored value.
        self.get_by_hash(&hash).ok_or_else(|| {
            talentrag_core::error::Error::InvalidInput("cache entry vanished after insert".into())
        })
    }

    pub fn is_dirty(&self) -> bool { self.dirty.load(Ordering::SeqCst) }

    /// Writes the store if anything was inserted since the last flush.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let _guard = self.flush_lock.lock();
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let mut records: Vec<CacheRecord> = self.entries.read().values().cloned().collect();
        records.sort_by(|a, b| a.content_hash.cmp(&b.content_hash));
        let file = CacheFile { embedder_id: self.embedder_id.clone(), records };
        if let Err(e) = write_json_atomic(path, &file) {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }
        tracing::debug!(path = %path.display(), records = file.records.len(), "embedding cache flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_exact_text() {
        assert_eq!(content_hash("leave policy"), content_hash("leave policy"));
        assert_ne!(content_hash("leave policy"), content_hash("leave policy "));
        assert_eq!(content_hash("").len(), 64);
    }

    #[test]
    fn first_writer_wins() {
        let cache = EmbeddingCache::in_memory("test");
        cache.put("a", vec![1.0]).expect("put");
        cache.put("a", vec![2.0]).expect("put");
        assert_eq!(cache.get("a"), Some(vec![1.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn get_or_insert_computes_once() {
        let cache = EmbeddingCache::in_memory("test");
        let mut calls = 0;
        let v = cache.get_or_insert_with("x", |_| { calls += 1; Ok(vec![0.5, 0.5]) }).expect("first");
        let w = cache.get_or_insert_with("x", |_| { calls += 1; Ok(vec![9.0, 9.0]) }).expect("second");
        assert_eq!(v, w);
        assert_eq!(calls, 1);
    }
}
