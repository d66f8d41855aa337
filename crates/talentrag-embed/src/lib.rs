//! Embedding providers: a local BERT sentence encoder for production and a
//! deterministic hashing embedder for tests.

pub mod bert;
pub mod device;
pub mod fake;
pub mod pool;
pub mod tokenize;

pub use bert::{resolve_model_dir, BertEmbedder};
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;

use talentrag_core::config::EmbeddingSettings;
use talentrag_core::error::Result;
use talentrag_core::traits::Embedder;

/// Dimensionality of `all-MiniLM-L6-v2`, mirrored by the fake embedder.
pub const DEFAULT_DIM: usize = 384;

/// Builds the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the fake one.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if settings.use_fake || env_fake {
        tracing::info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(DEFAULT_DIM)));
    }
    let dir = resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Box::new(BertEmbedder::load(&dir)?))
}
