use anyhow::{Context, Result};
use consultant_core::SamplingConfig;
use consultant_data_services::{Embedder, ScoredChunk};

use super::llm_client::ChatModel;
use super::metrics::{GenerationMetrics, MetricsTimer};
use super::prompt_formatter::LlmPromptFormatter;
use super::rag_retriever::RagRetriever;

/// Answer produced for a query
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    /// Generated answer text
    pub result: String,

    /// Chunks the answer was grounded on, most similar first
    pub source_documents: Vec<ScoredChunk>,

    pub metrics: GenerationMetrics,
}

impl GenerationResult {
    /// A result with no sources or metrics attached
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            source_documents: Vec::new(),
            metrics: GenerationMetrics::default(),
        }
    }
}

/// Retrieval-augmented answer generation over a chat model
pub struct AnswerGenerator<M: ChatModel> {
    model: M,
}

impl<M: ChatModel> AnswerGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Answer `query` from the chunks `retriever` returns, sampling with
    /// `temperature` and `top_p`.
    ///
    /// This method:
    /// 1. Retrieves the most similar policy chunks
    /// 2. Formats the prompt with those excerpts
    /// 3. Calls the chat model
    pub async fn generate_answer<E: Embedder>(
        &self,
        query: &str,
        retriever: &RagRetriever<E>,
        temperature: f32,
        top_p: f32,
    ) -> Result<GenerationResult> {
        let sampling = SamplingConfig::new(temperature, top_p);
        let mut metrics = GenerationMetrics::new();

        tracing::info!("Generating answer ({})", sampling);

        // Retrieve context
        let timer = MetricsTimer::start();
        let source_documents = retriever
            .retrieve(query)
            .await
            .context("Retrieval failed")?;
        metrics.set_retrieval_latency(timer.stop());
        metrics.set_similarity_scores(source_documents.iter().map(|s| s.score).collect());

        if source_documents.is_empty() {
            tracing::warn!("No policy context retrieved, prompting without excerpts");
        }

        let prompt = LlmPromptFormatter::format(query, &source_documents);

        // Call LLM
        let timer = MetricsTimer::start();
        let response = self.model.complete(&prompt, sampling).await?;
        metrics.set_llm_latency(timer.stop());
        metrics.tokens_used = response.tokens_used;

        metrics.report();
        tracing::debug!("LLM answer: {}", response.raw_response);

        Ok(GenerationResult {
            result: response.raw_response,
            source_documents,
            metrics,
        })
    }
}
