use crate::error::Result;

/// Embedding Provider capability.
///
/// Implementations must be deterministic for a given `embedder_id` and input,
/// and must return vectors of exactly `dim()` components.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `bert:all-MiniLM-L6-v2:d384:3f9a0c12b7de`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| {
            crate::error::Error::provider(
                crate::error::ProviderErrorKind::InvalidResponse,
                "embedder returned no vector",
            )
        })
    }
}

/// Sampling knobs for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionParams {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

/// Language Model Provider capability.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, system: Option<&str>, prompt: &str, params: CompletionParams) -> Result<String>;
}

/// Document extraction capability. An empty string means nothing usable was found.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, source_name: &str, bytes: &[u8]) -> String;
}
