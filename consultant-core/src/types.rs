pub mod document;
pub mod sampling;

// Re-export common types
pub use document::{Chunk, Document};
pub use sampling::SamplingConfig;
