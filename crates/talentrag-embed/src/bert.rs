use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use talentrag_core::error::{Error, ProviderErrorKind, Result};
use talentrag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const MAX_LEN: usize = 256;
const PAD_ID: u32 = 0;

fn model_err(e: impl std::fmt::Display) -> Error {
    Error::provider(ProviderErrorKind::Model, e.to_string())
}

/// Local sentence-embedding model (BERT encoder, e.g. `all-MiniLM-L6-v2`)
/// with mean pooling and L2 normalization.
///
/// The model directory must contain `tokenizer.json`, `config.json` and either
/// `model.safetensors` or `pytorch_model.bin`.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence-embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| model_err(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;

        let config_text = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let raw: serde_json::Value = serde_json::from_str(&config_text)?;
        let dim = raw["hidden_size"]
            .as_u64()
            .ok_or_else(|| model_err("config.json has no hidden_size"))? as usize;

        let weights_path = weights_file(model_dir);
        let weights = load_weights(&weights_path, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).map_err(model_err)?;

        let id = embedder_id_for(model_dir, &config_text, &weights_path, dim)?;
        tracing::info!(model = %id, dim, "embedding model ready");
        Ok(Self { model, tokenizer, device, id, dim })
    }

    fn forward(&self, texts: &[String]) -> candle_core::Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, MAX_LEN, PAD_ID, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()
    }
}

fn weights_file(model_dir: &Path) -> PathBuf {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() { safetensors } else { model_dir.join("pytorch_model.bin") }
}

fn load_weights(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    if path.extension().is_some_and(|e| e == "safetensors") {
        return candle_core::safetensors::load(path, device).map_err(model_err);
    }
    let weights = candle_core::pickle::read_all(path).map_err(model_err)?;
    Ok(weights.into_iter().collect())
}

/// `bert:<dir name>:d<dim>:<digest>`, where the digest covers `config.json`
/// and the weights, so same-named directories holding different models
/// never share cache entries.
fn embedder_id_for(model_dir: &Path, config_text: &str, weights_path: &Path, dim: usize) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(config_text.as_bytes());
    let mut weights = std::fs::File::open(weights_path)?;
    std::io::copy(&mut weights, &mut hasher)?;
    let digest = hasher.finalize().to_hex();
    let name = model_dir.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "bert".to_string());
    Ok(format!("bert:{name}:d{dim}:{}", &digest[..12]))
}

impl Embedder for BertEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let out = self.forward(texts).map_err(model_err)?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

/// Finds the model directory: explicit setting, then `APP_MODEL_DIR`, `MODEL_DIR`,
/// then `models/all-MiniLM-L6-v2` relative to the working directory or its parent.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(talentrag_core::config::expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("models/all-MiniLM-L6-v2"), PathBuf::from("../models/all-MiniLM-L6-v2")]);
    for dir in candidates {
        if dir.exists() {
            tracing::debug!(dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(Error::InvalidConfig("could not locate the sentence-embedding model directory".into()))
}
