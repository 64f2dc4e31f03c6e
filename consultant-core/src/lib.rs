pub mod error;
pub mod settings;
pub mod types;

// Re-export common types
pub use error::RagError;
pub use settings::Settings;
pub use types::{Chunk, Document, SamplingConfig};
