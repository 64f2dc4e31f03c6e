pub mod llm;

// Re-export commonly used items from llm module
pub use llm::{
    AnswerGenerator, ChatModel, GenerationMetrics, GenerationResult, LlmClient, LlmConfig,
    LlmPromptFormatter, LlmResponse, RagRetriever,
};
