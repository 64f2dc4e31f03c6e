use anyhow::Result;
use consultant_core::{Chunk, Settings};
use std::path::{Path, PathBuf};
use tracing;

use super::chunker::{split_documents, ChunkingConfig};
use super::document_loader::load_documents;
use super::embeddings::Embedder;
use super::vector_store::VectorStore;

/// Chunks embedded per fastembed call
const BATCH_SIZE: usize = 100;

/// Statistics from an ingestion run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestStats {
    pub documents_loaded: usize,
    pub chunks_created: usize,
    pub embeddings_generated: usize,
}

/// Embed chunks in batches and persist them as a new index at `index_path`.
pub fn create_vector_store<E: Embedder + ?Sized, P: AsRef<Path>>(
    index_path: P,
    chunks: Vec<Chunk>,
    embedder: &E,
) -> Result<(VectorStore, IngestStats)> {
    let mut stats = IngestStats {
        chunks_created: chunks.len(),
        ..Default::default()
    };

    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|c| c.to_embedding_text()).collect();

        tracing::info!("Generating embeddings for batch of {} chunks...", texts.len());

        let vectors = embedder.embed(texts)?;
        stats.embeddings_generated += vectors.len();
        embeddings.extend(vectors);

        tracing::debug!(
            "Processed {} embeddings (total: {})",
            batch.len(),
            stats.embeddings_generated
        );
    }

    let store = VectorStore::create(index_path, chunks, embeddings, embedder.model_name())?;
    Ok((store, stats))
}

/// Open an existing index for use with `embedder`.
///
/// A model mismatch is only reported; the index is not rebuilt.
pub fn load_vector_store<E: Embedder + ?Sized, P: AsRef<Path>>(
    index_path: P,
    embedder: &E,
) -> Result<VectorStore> {
    let store = VectorStore::open(index_path)?;

    let stored_model = &store.metadata().embedding_model;
    if stored_model != embedder.model_name() {
        tracing::warn!(
            "Index was built with {} but current embedding model is {}; rebuild with rag-ingest --force",
            stored_model,
            embedder.model_name()
        );
    }

    Ok(store)
}

/// Ingestion pipeline that:
/// 1. Loads raw documents from the data directory
/// 2. Splits them into overlapping chunks
/// 3. Generates embeddings
/// 4. Persists the vector index
pub struct IngestionPipeline<'a, E: Embedder + ?Sized> {
    data_dir: PathBuf,
    index_path: PathBuf,
    chunking: ChunkingConfig,
    embedder: &'a E,
}

/// Result of an ingestion run
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Built(IngestStats),
    /// An index already existed and `force` was not set
    Skipped,
}

impl<'a, E: Embedder + ?Sized> IngestionPipeline<'a, E> {
    pub fn new(settings: &Settings, embedder: &'a E) -> Self {
        Self {
            data_dir: settings.data_dir.clone(),
            index_path: settings.index_path.clone(),
            chunking: ChunkingConfig::from_settings(settings),
            embedder,
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Build the index. With `force`, an existing index is rebuilt; it is
    /// only replaced once the new one has been committed.
    pub fn run(&self, force: bool) -> Result<IngestOutcome> {
        if VectorStore::exists(&self.index_path) {
            if !force {
                tracing::info!(
                    "Vector index already exists at {}, skipping (use --force to rebuild)",
                    self.index_path.display()
                );
                return Ok(IngestOutcome::Skipped);
            }

            tracing::info!("Rebuilding existing index at {}", self.index_path.display());
        }

        // Step 1: Load documents
        let documents = load_documents(&self.data_dir)?;

        // Step 2: Chunk
        let chunks = split_documents(&documents, &self.chunking)?;

        // Step 3 + 4: Embed and persist
        let (store, mut stats) = create_vector_store(&self.index_path, chunks, self.embedder)?;
        stats.documents_loaded = documents.len();

        tracing::info!(
            "Ingestion complete: {:?} -> {}",
            stats,
            store.path().display()
        );
        Ok(IngestOutcome::Built(stats))
    }
}
