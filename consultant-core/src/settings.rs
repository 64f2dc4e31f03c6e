use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RagError;

/// Workspace-wide settings, read from the process environment
/// (after `.env` has been loaded by the binary).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding the raw policy documents
    pub data_dir: PathBuf,

    /// Directory of the persisted vector index
    pub index_path: PathBuf,

    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Embedding model name (see `consultant_data_services::rag::embeddings`)
    pub embedding_model: String,

    /// Number of chunks handed to the LLM per query
    pub retriever_top_k: usize,

    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub llm_requests_per_minute: u32,
    pub llm_timeout_seconds: u64,
    pub llm_max_retries: u32,

    /// API key; when unset the client falls back to `OPENAI_API_KEY` handling of the SDK
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    pub openai_api_base: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_path: PathBuf::from("vector_index"),
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_model: "bge-small-en-v1.5".to_string(),
            retriever_top_k: 3,
            llm_model: "gpt-4o-mini".to_string(),
            llm_max_tokens: 512,
            llm_requests_per_minute: 10,
            llm_timeout_seconds: 30,
            llm_max_retries: 3,
            openai_api_key: None,
            openai_api_base: None,
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Result<Self, RagError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let settings = Self {
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            index_path: get("VECTOR_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            chunk_size: parse_or(get("CHUNK_SIZE"), "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(get("CHUNK_OVERLAP"), "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            retriever_top_k: parse_or(
                get("RETRIEVER_TOP_K"),
                "RETRIEVER_TOP_K",
                defaults.retriever_top_k,
            )?,
            llm_model: get("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_max_tokens: parse_or(get("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            llm_requests_per_minute: parse_or(
                get("LLM_REQUESTS_PER_MINUTE"),
                "LLM_REQUESTS_PER_MINUTE",
                defaults.llm_requests_per_minute,
            )?,
            llm_timeout_seconds: parse_or(
                get("LLM_TIMEOUT_SECONDS"),
                "LLM_TIMEOUT_SECONDS",
                defaults.llm_timeout_seconds,
            )?,
            llm_max_retries: parse_or(
                get("LLM_MAX_RETRIES"),
                "LLM_MAX_RETRIES",
                defaults.llm_max_retries,
            )?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_base: get("OPENAI_API_BASE"),
        };

        tracing::debug!(
            "Loaded settings: data_dir={}, index_path={}, embedding_model={}, llm_model={}",
            settings.data_dir.display(),
            settings.index_path.display(),
            settings.embedding_model,
            settings.llm_model
        );

        Ok(settings)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, RagError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RagError::Config(format!("{} has an invalid value: {:?}", key, raw))),
    }
}
