pub mod chunker;
pub mod document_loader;
pub mod embeddings;
pub mod ingestion_pipeline;
pub mod vector_store;

// Re-export commonly used items
pub use chunker::{split_documents, ChunkingConfig};
pub use document_loader::load_documents;
pub use embeddings::{get_embedding_model, Embedder, FastEmbedder};
pub use ingestion_pipeline::{
    create_vector_store, load_vector_store, IngestOutcome, IngestStats, IngestionPipeline,
};
pub use vector_store::{IndexMetadata, ScoredChunk, VectorStore};
