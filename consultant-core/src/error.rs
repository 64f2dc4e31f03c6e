use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document directory does not exist: {}", .0.display())]
    DocumentsNotFound(PathBuf),

    #[error("No loadable documents found in {}", .0.display())]
    NoDocuments(PathBuf),

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Unsupported embedding model: {0}")]
    UnsupportedEmbeddingModel(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid sampling parameters: {0}")]
    InvalidSampling(String),

    #[error("LLM error: {0}")]
    Llm(String),
}
