//! Question answering over the ingested corpus.

use talentrag_core::error::{Error, Result};
use talentrag_core::types::{Answer, RetrievedChunk};

use crate::context::Engine;
use crate::prompts;

/// Returned without calling the model when there is nothing to retrieve.
pub const FALLBACK_ANSWER: &str = "No policy documents are loaded yet. Ingest some documents first.";

impl Engine {
    /// The `top_k` chunks closest to `query`, nearest first.
    ///
    /// The query is embedded fresh on every call and never cached.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".into()));
        }
        let corpus = self.corpus.read();
        if corpus.index.is_empty() {
            return Err(Error::IndexNotReady);
        }
        let q = self.embedder().embed_one(query)?;
        self.check_dim(&q)?;
        let hits = corpus.index.search(&q, top_k)?;
        let out: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter_map(|hit| {
                let chunk = corpus.chunk(&hit.chunk_id)?;
                Some(RetrievedChunk {
                    chunk_text: chunk.text.clone(),
                    source_name: corpus.source_of(chunk).to_string(),
                    distance: hit.distance,
                })
            })
            .collect();
        tracing::debug!(query_chars = query.len(), hits = out.len(), "retrieved");
        Ok(out)
    }

    /// Retrieves context for `query` and asks the model to answer from it alone.
    pub async fn generate_answer(&self, query: &str) -> Result<Answer> {
        self.generate_answer_with(query, self.settings().retrieval.top_k).await
    }

    /// [`Engine::generate_answer`] with an explicit number of context chunks.
    pub async fn generate_answer_with(&self, query: &str, top_k: usize) -> Result<Answer> {
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".into()));
        }
        let chunks = match self.retrieve(query, top_k) {
            Ok(chunks) => chunks,
            Err(Error::IndexNotReady) => Vec::new(),
            Err(e) => return Err(e),
        };
        if chunks.is_empty() {
            tracing::info!("no indexed documents, returning fallback answer");
            return Ok(Answer { answer: FALLBACK_ANSWER.to_string(), sources: Vec::new() });
        }
        let context = build_context(&chunks);
        let sources = cite_sources(&chunks);
        let answer = self
            .llm()
            .complete(Some(prompts::ANSWER_SYSTEM), &prompts::answer(&context, query), prompts::ANSWER_PARAMS)
            .await?;
        tracing::info!(sources = ?sources, "answer generated");
        Ok(Answer { answer, sources })
    }
}

/// Chunks joined by blank lines, each preceded by `[From <source>]`.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("[From {}]\n{}", c.source_name, c.chunk_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Distinct source names in the order they first appear in the ranking.
pub fn cite_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for c in chunks {
        if !sources.contains(&c.source_name) {
            sources.push(c.source_name.clone());
        }
    }
    sources
}
