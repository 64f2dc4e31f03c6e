use anyhow::{Context, Result};
use consultant_core::{RagError, Settings};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing;

/// Anything that can turn text into fixed-size vectors.
pub trait Embedder: Send + Sync {
    /// Name recorded in the index metadata
    fn model_name(&self) -> &str;

    /// Length of every vector returned by `embed`
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in order.
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(vec![query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Failed to generate query embedding".to_string()).into())
    }
}

/// Map a configured model name onto a fastembed model and its dimension.
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize), RagError> {
    match name.to_lowercase().as_str() {
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        _ => Err(RagError::UnsupportedEmbeddingModel(name.to_string())),
    }
}

/// Local ONNX embedding model via fastembed.
pub struct FastEmbedder {
    model: TextEmbedding,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Load the named model (downloads it on first run).
    pub fn new(model_name: &str) -> Result<Self> {
        let (model, dimension) = resolve_model(model_name)?;

        tracing::info!("Loading embedding model ({})...", model_name);
        let model = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(true),
        )
        .with_context(|| format!("Failed to initialize embedding model {}", model_name))?;

        Ok(Self {
            model,
            model_name: model_name.to_lowercase(),
            dimension,
        })
    }
}

impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let count = texts.len();
        let embeddings = self
            .model
            .embed(texts, None)
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if embeddings.len() != count {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                count,
                embeddings.len()
            ))
            .into());
        }

        Ok(embeddings)
    }
}

/// Embedding model named by the settings.
pub fn get_embedding_model(settings: &Settings) -> Result<FastEmbedder> {
    FastEmbedder::new(&settings.embedding_model)
}
