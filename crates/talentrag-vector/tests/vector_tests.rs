use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use talentrag_core::cancel::CancelFlag;
use talentrag_core::error::{Error, Result};
use talentrag_core::traits::Embedder;
use talentrag_core::types::IndexEntry;
use talentrag_embed::FakeEmbedder;
use talentrag_vector::{BatchEmbedder, ChunkMeta, EmbeddingCache, IndexSnapshot, VectorIndex};

/// Wraps the fake embedder and counts texts sent to it.
struct CountingEmbedder {
    inner: FakeEmbedder,
    texts: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self { inner: FakeEmbedder::new(32), texts: AtomicUsize::new(0) }
    }
    fn calls(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

impl Embedder for CountingEmbedder {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// Returns vectors one component short of what it advertises.
struct ShortEmbedder;

impl Embedder for ShortEmbedder {
    fn embedder_id(&self) -> &str { "short" }
    fn dim(&self) -> usize { 4 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.5; 3]).collect())
    }
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn cache_survives_restart_without_provider_calls() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("cache.json");
    let corpus = texts(&["annual leave is 20 days", "remote work needs approval", "payroll runs monthly"]);
    let batcher = BatchEmbedder::new(2, 2).unwrap();

    let first_embedder = CountingEmbedder::new();
    let first = {
        let cache = EmbeddingCache::open(&path, first_embedder.embedder_id()).unwrap();
        batcher.embed_all(&first_embedder, &cache, &corpus, &CancelFlag::new()).unwrap()
    };
    assert_eq!(first_embedder.calls(), 3);
    assert_eq!(first.computed, 3);

    let second_embedder = CountingEmbedder::new();
    let cache = EmbeddingCache::open(&path, second_embedder.embedder_id()).unwrap();
    assert_eq!(cache.len(), 3);
    let second = batcher.embed_all(&second_embedder, &cache, &corpus, &CancelFlag::new()).unwrap();
    assert_eq!(second_embedder.calls(), 0, "every text should come from the reloaded cache");
    assert_eq!(second.cache_hits, 3);
    assert_eq!(first.vectors, second.vectors);
}

#[test]
fn cache_from_another_embedder_is_ignored() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("cache.json");
    let cache = EmbeddingCache::open(&path, "model-a").unwrap();
    cache.put("hello", vec![1.0, 0.0]).unwrap();
    cache.flush().unwrap();
    let other = EmbeddingCache::open(&path, "model-b").unwrap();
    assert!(other.is_empty());
    assert_eq!(EmbeddingCache::open(&path, "model-a").unwrap().len(), 1);
}

#[test]
fn cache_writes_reach_disk_only_on_flush() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("cache.json");
    let cache = EmbeddingCache::open(&path, "model-a").unwrap();
    cache.put("first", vec![1.0]).unwrap();
    cache.put("second", vec![2.0]).unwrap();
    assert_eq!(cache.get("second"), Some(vec![2.0]));
    assert!(cache.is_dirty());
    assert!(!path.exists());

    cache.flush().unwrap();
    assert!(!cache.is_dirty());
    assert_eq!(EmbeddingCache::open(&path, "model-a").unwrap().len(), 2);

    // Re-inserting a known text changes nothing, so there is nothing to write.
    cache.put("first", vec![9.0]).unwrap();
    assert!(!cache.is_dirty());
}

#[test]
fn duplicate_texts_are_embedded_once_and_order_is_kept() {
    let embedder = CountingEmbedder::new();
    let cache = EmbeddingCache::in_memory(embedder.embedder_id());
    let batcher = BatchEmbedder::new(8, 2).unwrap();
    let input = texts(&["rust", "python", "rust"]);
    let out = batcher.embed_all(&embedder, &cache, &input, &CancelFlag::new()).unwrap();
    assert_eq!(embedder.calls(), 2);
    assert_eq!(out.vectors.len(), 3);
    assert_eq!(out.vectors[0], out.vectors[2]);
    assert_eq!(out.vectors[1], embedder.inner.embed_text("python"));
}

#[test]
fn wrong_dimension_from_provider_is_rejected() {
    let cache = EmbeddingCache::in_memory("short");
    let batcher = BatchEmbedder::new(4, 1).unwrap();
    let err = batcher.embed_all(&ShortEmbedder, &cache, &texts(&["a"]), &CancelFlag::new()).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
    assert!(cache.is_empty(), "bad vectors must not be cached");
}

#[test]
fn cancelled_embedding_stops_before_provider() {
    let embedder = CountingEmbedder::new();
    let cache = EmbeddingCache::in_memory(embedder.embedder_id());
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = BatchEmbedder::new(1, 1)
        .unwrap()
        .embed_all(&embedder, &cache, &texts(&["a", "b"]), &cancel)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn snapshot_round_trip_rebuilds_identical_index() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index.json");
    let embedder = FakeEmbedder::new(16);
    let docs = ["vacation policy", "expense reports", "security training"];
    let chunks: Vec<ChunkMeta> = docs
        .iter()
        .enumerate()
        .map(|(i, _)| ChunkMeta { chunk_id: format!("doc{i}:0"), source_name: format!("doc{i}.txt"), ordinal: 0 })
        .collect();
    let vectors: Vec<Vec<f32>> = docs.iter().map(|d| embedder.embed_text(d)).collect();

    let snap = IndexSnapshot::new("corpus".into(), embedder.embedder_id().into(), chunks, vectors).unwrap();
    snap.save(&path).unwrap();
    let loaded = IndexSnapshot::load(&path).expect("snapshot should load");
    assert!(loaded.matches("corpus", embedder.embedder_id()));
    assert!(!loaded.matches("other", embedder.embedder_id()));
    assert_eq!(loaded.dim, 16);

    let query = embedder.embed_text("expense reports");
    let before = snap.to_index().unwrap().search(&query, 3).unwrap();
    let after = loaded.to_index().unwrap().search(&query, 3).unwrap();
    assert_eq!(before, after);
    assert_eq!(after[0].chunk_id, "doc1:0");
}

#[test]
fn missing_or_corrupt_snapshot_loads_as_none() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index.json");
    assert!(IndexSnapshot::load(&path).is_none());
    std::fs::write(&path, "{ not json").unwrap();
    assert!(IndexSnapshot::load(&path).is_none());
}

#[test]
fn rebuild_is_idempotent_and_search_returns_min_k_n() {
    let embedder = FakeEmbedder::new(24);
    let entries: Vec<IndexEntry> = ["alpha beta", "gamma delta", "epsilon zeta", "eta theta"]
        .iter()
        .enumerate()
        .map(|(i, t)| IndexEntry { chunk_id: format!("c{i}"), vector: embedder.embed_text(t) })
        .collect();
    let a = VectorIndex::build(entries.clone()).unwrap();
    let b = VectorIndex::build(entries).unwrap();
    let q = embedder.embed_text("gamma");
    for k in [1, 2, 4, 10] {
        let ha = a.search(&q, k).unwrap();
        assert_eq!(ha.len(), k.min(4));
        assert_eq!(ha, b.search(&q, k).unwrap());
    }
}
