//! Local sentence-transformer inference through fastembed (ONNX Runtime)

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use tracing::{debug, info};

use super::models::{build_result, chunk_text, Chunk, EmbedResult};
use super::{DelegateFactory, EmbeddingDelegate};
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

/// A supported model matched by name
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub model: EmbeddingModel,
    pub code: String,
    pub dimension: usize,
}

/// Resolve a model name against fastembed's supported list.
///
/// Full codes (`sentence-transformers/all-MiniLM-L6-v2`) match first. Short
/// names (`all-MiniLM-L6-v2`) match the part after the last `/`, ignoring
/// case and an `-onnx` suffix.
pub fn resolve_model(name: &str) -> Result<ResolvedModel, EmbeddingError> {
    let supported = TextEmbedding::list_supported_models();
    let wanted = short_name(name);

    let found = supported
        .iter()
        .find(|info| info.model_code.eq_ignore_ascii_case(name))
        .or_else(|| supported.iter().find(|info| short_name(&info.model_code) == wanted))
        .ok_or_else(|| EmbeddingError::UnsupportedModel(name.to_string()))?;

    Ok(ResolvedModel {
        model: found.model.clone(),
        code: found.model_code.clone(),
        dimension: found.dim,
    })
}

fn short_name(code: &str) -> String {
    let tail = code.rsplit('/').next().unwrap_or(code).to_ascii_lowercase();
    match tail.strip_suffix("-onnx") {
        Some(stripped) => stripped.to_string(),
        None => tail,
    }
}

/// One loaded ONNX model, owned by a single request
pub struct FastEmbedDelegate {
    name: String,
    resolved: ResolvedModel,
    batch_size: Option<usize>,
    engine: Option<TextEmbedding>,
}

impl FastEmbedDelegate {
    /// Load the named model, downloading it into the cache directory if needed
    pub fn new(name: &str, config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let resolved = resolve_model(name)?;

        let mut options = TextInitOptions::new(resolved.model.clone())
            .with_show_download_progress(config.show_download_progress);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        let engine = TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelLoad {
            model: name.to_string(),
            reason: e.to_string(),
        })?;

        debug!(model = %resolved.code, dim = resolved.dimension, "Model loaded");

        Ok(Self {
            name: name.to_string(),
            resolved,
            batch_size: config.batch_size,
            engine: Some(engine),
        })
    }

    pub fn dimension(&self) -> usize {
        self.resolved.dimension
    }
}

impl EmbeddingDelegate for FastEmbedDelegate {
    fn model(&self) -> &str {
        &self.name
    }

    fn embed_transcript(&mut self, chunks: &[Chunk]) -> Result<EmbedResult, EmbeddingError> {
        let texts = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| chunk_text(i, chunk).map(str::to_owned))
            .collect::<Result<Vec<String>, _>>()?;

        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| EmbeddingError::Inference("model already released".to_string()))?;

        debug!(count = texts.len(), "Embedding batch");
        let embeddings = engine
            .embed(texts, self.batch_size)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::Inference(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        Ok(build_result(&self.name, self.resolved.dimension, chunks, embeddings))
    }

    fn cleanup(&mut self) -> Result<(), EmbeddingError> {
        if self.engine.take().is_some() {
            debug!(model = %self.name, "Released ONNX session");
        }
        Ok(())
    }
}

/// Builds a [`FastEmbedDelegate`] per request
#[derive(Debug, Clone)]
pub struct FastEmbedFactory {
    config: EmbeddingConfig,
}

impl FastEmbedFactory {
    pub fn new(config: EmbeddingConfig) -> Self {
        info!(
            default_model = %config.default_model,
            cache_dir = ?config.cache_dir,
            "Initialized fastembed delegate factory"
        );
        Self { config }
    }
}

impl DelegateFactory for FastEmbedFactory {
    fn create(&self, model: &str) -> Result<Box<dyn EmbeddingDelegate>, EmbeddingError> {
        Ok(Box::new(FastEmbedDelegate::new(model, &self.config)?))
    }
}
