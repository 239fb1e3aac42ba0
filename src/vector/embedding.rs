//! Embedding generation for description text and search queries.
//!
//! The store only depends on the [`Embedder`] trait. [`FastEmbedder`] is the
//! production implementation backed by fastembed; tests plug in deterministic
//! embedders instead.

use crate::vector::{VECTOR_DIMENSION_1024, VectorDimension, VectorError};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Turns text into a fixed-length vector.
///
/// Implementations must be thread-safe. Output does not need to be
/// normalized or deterministic, but it must have exactly
/// [`dimension`](Embedder::dimension) components.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    /// Returns `VectorError::EmbeddingFailed` when the model cannot produce a
    /// vector, or `DimensionMismatch` when it produces one of the wrong size.
    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError>;

    /// Get the dimension of embeddings produced by this embedder.
    #[must_use]
    fn dimension(&self) -> VectorDimension;
}

/// fastembed-backed embedder.
///
/// Defaults to BGE large v1.5, which produces 1024-dimensional vectors.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: VectorDimension,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedder {
    /// Load `model_name` (see [`parse_embedding_model`]) into memory.
    ///
    /// The model is downloaded into `cache_dir` on first use.
    ///
    /// # Errors
    /// Returns an error if the name is unknown, the model fails to
    /// initialize, or its output dimension cannot be determined.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self, VectorError> {
        let model = parse_embedding_model(model_name)?;
        let canonical_name = model_to_string(&model);
        let cache_dir = cache_dir.unwrap_or_else(default_models_dir);

        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download")
        ))?;

        // Measure the real output width instead of trusting a table
        let sample = text_model
            .embed(vec!["dimension check"], None)
            .map_err(|e| VectorError::EmbeddingFailed(format!("Failed to query model: {e}")))?;
        let width = sample.first().map(Vec::len).unwrap_or_default();
        let dimension = VectorDimension::new(width)?;

        Ok(Self {
            model: Mutex::new(text_model),
            model_name: canonical_name,
            dimension,
        })
    }

    /// Model name as accepted by [`parse_embedding_model`].
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(vec![text], None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embedding: {e}"))
            })?;

        let embedding = embeddings.into_iter().next().ok_or_else(|| {
            VectorError::EmbeddingFailed("Model returned no embedding".to_string())
        })?;

        self.dimension.validate_vector(&embedding)?;
        Ok(embedding)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

/// [`FastEmbedder`] that loads its model on first use.
///
/// Opening a store needs the dimension but not the model, so commands that
/// never embed skip the model load entirely. A failed load is remembered and
/// reported by every later `embed` call.
pub struct LazyFastEmbedder {
    model_name: String,
    cache_dir: Option<PathBuf>,
    dimension: VectorDimension,
    loaded: OnceLock<Result<FastEmbedder, String>>,
}

impl std::fmt::Debug for LazyFastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyFastEmbedder")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .field("loaded", &self.loaded.get().is_some())
            .finish()
    }
}

impl LazyFastEmbedder {
    /// Validates the model name now; loading happens on the first `embed`.
    pub fn new(
        model_name: &str,
        cache_dir: Option<PathBuf>,
        dimension: VectorDimension,
    ) -> Result<Self, VectorError> {
        parse_embedding_model(model_name)?;
        Ok(Self {
            model_name: model_name.to_string(),
            cache_dir,
            dimension,
            loaded: OnceLock::new(),
        })
    }
}

impl Embedder for LazyFastEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let loaded = self.loaded.get_or_init(|| {
            tracing::info!(model = %self.model_name, "Loading embedding model");
            FastEmbedder::new(&self.model_name, self.cache_dir.clone()).map_err(|e| e.to_string())
        });

        match loaded {
            Ok(embedder) => {
                let embedding = embedder.embed(text)?;
                self.dimension.validate_vector(&embedding)?;
                Ok(embedding)
            }
            Err(reason) => Err(VectorError::EmbeddingFailed(reason.clone())),
        }
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

/// Directory where fastembed caches downloaded models.
#[must_use]
pub fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("debate-search")
        .join("models")
}

/// Map a configuration string to a fastembed model.
///
/// Only models with 1024-dimensional output are accepted, since the index
/// snapshot is tied to one dimension.
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, VectorError> {
    match name {
        "BGELargeENV15" => Ok(EmbeddingModel::BGELargeENV15),
        "MxbaiEmbedLargeV1" => Ok(EmbeddingModel::MxbaiEmbedLargeV1),
        "MultilingualE5Large" => Ok(EmbeddingModel::MultilingualE5Large),
        other => Err(VectorError::EmbeddingFailed(format!(
            "Unknown embedding model '{other}'. Supported {VECTOR_DIMENSION_1024}-dimension models: BGELargeENV15, MxbaiEmbedLargeV1, MultilingualE5Large"
        ))),
    }
}

/// Inverse of [`parse_embedding_model`].
#[must_use]
pub fn model_to_string(model: &EmbeddingModel) -> String {
    match model {
        EmbeddingModel::BGELargeENV15 => "BGELargeENV15".to_string(),
        EmbeddingModel::MxbaiEmbedLargeV1 => "MxbaiEmbedLargeV1".to_string(),
        EmbeddingModel::MultilingualE5Large => "MultilingualE5Large".to_string(),
        other => format!("{other:?}"),
    }
}
