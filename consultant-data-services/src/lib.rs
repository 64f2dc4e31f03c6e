pub mod rag;

// Re-export commonly used items
pub use rag::{
    ChunkingConfig, Embedder, FastEmbedder, IngestOutcome, IngestStats, IngestionPipeline, ScoredChunk,
    VectorStore,
};
