//! The `Engine` context: providers, embedding cache and the current corpus.
//!
//! One `Engine` is built per process (or test) and passed by reference to
//! every operation. The corpus and its index are swapped wholesale on each
//! ingest; readers take a shared lock and never observe a half-built index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use talentrag_core::cancel::CancelFlag;
use talentrag_core::chunker::Chunker;
use talentrag_core::config::Settings;
use talentrag_core::data_processor::{DataProcessor, DocumentExtractor, SourceFile};
use talentrag_core::error::{Error, Result};
use talentrag_core::traits::{Embedder, LanguageModel, TextExtractor};
use talentrag_core::types::{Chunk, ChunkId, Document, IndexEntry};
use talentrag_embed::get_default_embedder;
use talentrag_llm::OpenAiCompatibleClient;
use talentrag_vector::{corpus_hash, BatchEmbedder, ChunkMeta, EmbeddingCache, IndexSnapshot, VectorIndex};

/// Outcome of one ingestion run.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// Sources skipped because nothing could be extracted.
    pub skipped: Vec<String>,
    pub cache_hits: usize,
    pub embedded: usize,
    /// True when vectors came from the persisted snapshot.
    pub reused_snapshot: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Corpus {
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) by_id: HashMap<ChunkId, usize>,
    pub(crate) sources: HashMap<String, String>,
    pub(crate) index: VectorIndex,
}

impl Corpus {
    fn new(documents: &[Document], chunks: Vec<Chunk>, index: VectorIndex) -> Self {
        let by_id = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        let sources = documents.iter().map(|d| (d.id.clone(), d.source_name.clone())).collect();
        Self { chunks, by_id, sources, index }
    }

    pub(crate) fn source_of(&self, chunk: &Chunk) -> &str {
        self.sources.get(&chunk.document_id).map(String::as_str).unwrap_or("unknown")
    }

    pub(crate) fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.by_id.get(id).map(|&i| &self.chunks[i])
    }
}

pub struct Engine {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    cache: EmbeddingCache,
    batcher: BatchEmbedder,
    index_path: Option<PathBuf>,
    pub(crate) corpus: RwLock<Corpus>,
}

impl Engine {
    /// Engine with on-disk cache and index snapshot at the configured paths.
    pub fn open(settings: Settings, embedder: Arc<dyn Embedder>, llm: Arc<dyn LanguageModel>) -> Result<Self> {
        settings.validate()?;
        let cache = EmbeddingCache::open(settings.storage.cache_path(), embedder.embedder_id())?;
        let index_path = Some(settings.storage.index_path());
        Self::assemble(settings, embedder, llm, cache, index_path)
    }

    /// Engine that keeps everything in memory.
    pub fn in_memory(settings: Settings, embedder: Arc<dyn Embedder>, llm: Arc<dyn LanguageModel>) -> Result<Self> {
        settings.validate()?;
        let cache = EmbeddingCache::in_memory(embedder.embedder_id());
        Self::assemble(settings, embedder, llm, cache, None)
    }

    /// Production wiring: configured embedder plus the OpenAI-compatible client.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
        let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiCompatibleClient::from_settings(&settings.llm)?);
        Self::open(settings, embedder, llm)
    }

    fn assemble(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        cache: EmbeddingCache,
        index_path: Option<PathBuf>,
    ) -> Result<Self> {
        let batcher = BatchEmbedder::new(settings.embedding.batch_size, settings.embedding.workers)?;
        tracing::info!(embedder = embedder.embedder_id(), llm = llm.name(), cached = cache.len(), "engine ready");
        Ok(Self { settings, embedder, llm, cache, batcher, index_path, corpus: RwLock::new(Corpus::default()) })
    }

    pub fn settings(&self) -> &Settings { &self.settings }
    pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }
    pub fn llm(&self) -> &dyn LanguageModel { self.llm.as_ref() }
    pub fn cache(&self) -> &EmbeddingCache { &self.cache }

    pub fn chunk_count(&self) -> usize { self.corpus.read().chunks.len() }
    pub fn is_indexed(&self) -> bool { !self.corpus.read().index.is_empty() }

    /// Extracts, chunks, embeds and indexes `sources`, replacing the current
    /// corpus. Files without extractable text are skipped and listed in the
    /// report.
    pub fn ingest(&self, sources: &[SourceFile], cancel: &CancelFlag) -> Result<IngestReport> {
        self.ingest_with(sources, &DocumentExtractor, cancel)
    }

    pub fn ingest_with(
        &self,
        sources: &[SourceFile],
        extractor: &dyn TextExtractor,
        cancel: &CancelFlag,
    ) -> Result<IngestReport> {
        let batch = DataProcessor::new().extract_documents(sources, extractor, cancel)?;
        let skipped: Vec<String> = batch
            .failures
            .iter()
            .map(|e| match e {
                Error::Ingestion { source_name, .. } => source_name.clone(),
                other => other.to_string(),
            })
            .collect();

        let chunker = Chunker::from_settings(&self.settings.chunking)?;
        let mut chunks = Vec::new();
        for doc in &batch.documents {
            cancel.check()?;
            chunks.extend(chunker.chunk_document(doc));
        }
        let names: HashMap<&str, &str> =
            batch.documents.iter().map(|d| (d.id.as_str(), d.source_name.as_str())).collect();
        let hash = corpus_hash(chunks.iter().map(|c| (names.get(c.document_id.as_str()).copied().unwrap_or(""), c)));

        let mut report = IngestReport {
            documents: batch.documents.len(),
            chunks: chunks.len(),
            skipped,
            ..IngestReport::default()
        };

        let index = match self.load_snapshot(&hash) {
            Some(index) => {
                report.reused_snapshot = true;
                index
            }
            None => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let outcome = self.batcher.embed_all(self.embedder.as_ref(), &self.cache, &texts, cancel)?;
                report.cache_hits = outcome.cache_hits;
                report.embedded = outcome.computed;
                let entries: Vec<IndexEntry> = chunks
                    .iter()
                    .zip(outcome.vectors)
                    .map(|(c, vector)| IndexEntry { chunk_id: c.id.clone(), vector })
                    .collect();
                let index = VectorIndex::build(entries)?;
                self.save_snapshot(&hash, &chunks, &names, &index)?;
                index
            }
        };

        if index.len() != chunks.len() {
            return Err(Error::InvalidInput(format!("index holds {} vectors for {} chunks", index.len(), chunks.len())));
        }
        *self.corpus.write() = Corpus::new(&batch.documents, chunks, index);
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            skipped = report.skipped.len(),
            reused_snapshot = report.reused_snapshot,
            "ingest complete"
        );
        Ok(report)
    }

    /// Reads `.txt`/`.md`/`.pdf` files under `dir` (sorted by path) and ingests them.
    pub fn ingest_directory(&self, dir: &Path, cancel: &CancelFlag) -> Result<IngestReport> {
        let sources = DataProcessor::new().read_directory(dir)?;
        tracing::info!(dir = %dir.display(), files = sources.len(), "ingesting directory");
        self.ingest(&sources, cancel)
    }

    fn load_snapshot(&self, hash: &str) -> Option<VectorIndex> {
        let path = self.index_path.as_ref()?;
        let snap = IndexSnapshot::load(path)?;
        if !snap.matches(hash, self.embedder.embedder_id()) {
            tracing::info!("corpus changed since last snapshot, rebuilding index");
            return None;
        }
        match snap.to_index() {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot could not be rebuilt, re-embedding");
                None
            }
        }
    }

    fn save_snapshot(&self, hash: &str, chunks: &[Chunk], names: &HashMap<&str, &str>, index: &VectorIndex) -> Result<()> {
        let Some(path) = &self.index_path else { return Ok(()) };
        let meta = chunks
            .iter()
            .map(|c| ChunkMeta {
                chunk_id: c.id.clone(),
                source_name: names.get(c.document_id.as_str()).copied().unwrap_or("").to_string(),
                ordinal: c.ordinal,
            })
            .collect();
        let vectors = index.vectors().map(<[f32]>::to_vec).collect();
        IndexSnapshot::new(hash.to_string(), self.embedder.embedder_id().to_string(), meta, vectors)?.save(path)
    }

    /// Embeds `text` through the cache, checking the provider's dimension.
    pub(crate) fn embed_cached(&self, text: &str) -> Result<Vec<f32>> {
        self.cache.get_or_insert_with(text, |t| {
            let vector = self.embedder.embed_one(t)?;
            self.check_dim(&vector)?;
            Ok(vector)
        })
    }

    pub(crate) fn check_dim(&self, vector: &[f32]) -> Result<()> {
        let expected = self.embedder.dim();
        if vector.len() != expected {
            return Err(Error::DimensionMismatch { expected, actual: vector.len() });
        }
        Ok(())
    }

    /// Flushes the embedding cache. Call once before the process exits.
    pub fn shutdown(self) -> Result<()> {
        self.cache.flush()?;
        tracing::info!(cached = self.cache.len(), "engine shut down");
        Ok(())
    }
}
