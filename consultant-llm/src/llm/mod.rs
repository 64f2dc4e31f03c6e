pub mod generator;
pub mod llm_client;
pub mod metrics;
pub mod prompt_formatter;
pub mod rag_retriever;

// Re-export commonly used items
pub use generator::{AnswerGenerator, GenerationResult};
pub use llm_client::{ChatModel, LlmClient, LlmConfig, LlmResponse};
pub use metrics::GenerationMetrics;
pub use prompt_formatter::LlmPromptFormatter;
pub use rag_retriever::{get_retriever, RagRetriever};
