//! Generation metrics
//!
//! Per-call measurements for a single answer:
//! - Retrieval latency (query embedding + similarity search)
//! - LLM inference latency
//! - Quality of the retrieved context (similarity range)
//! - Token usage reported by the provider

use std::time::{Duration, Instant};

/// Metrics for one `generate_answer` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationMetrics {
    /// Time taken to embed the query and search the index (milliseconds)
    pub retrieval_latency_ms: u64,

    /// Time taken for the LLM to generate the response (milliseconds)
    pub llm_latency_ms: u64,

    /// Similarity scores of the retrieved chunks, in retrieval order
    pub similarity_scores: Vec<f32>,

    /// Minimum similarity score among retrieved chunks
    pub similarity_min: Option<f32>,

    /// Maximum similarity score among retrieved chunks
    pub similarity_max: Option<f32>,

    /// Number of chunks placed in the prompt
    pub num_sources: usize,

    /// Total tokens reported by the provider, if any
    pub tokens_used: Option<u32>,
}

impl GenerationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_retrieval_latency(&mut self, duration: Duration) {
        self.retrieval_latency_ms = duration.as_millis() as u64;
    }

    pub fn set_llm_latency(&mut self, duration: Duration) {
        self.llm_latency_ms = duration.as_millis() as u64;
    }

    /// Record similarity scores and compute their range
    pub fn set_similarity_scores(&mut self, scores: Vec<f32>) {
        self.similarity_min = scores
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        self.similarity_max = scores
            .iter()
            .copied()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        self.num_sources = scores.len();
        self.similarity_scores = scores;
    }

    pub fn avg_similarity(&self) -> f32 {
        if self.similarity_scores.is_empty() {
            0.0
        } else {
            self.similarity_scores.iter().sum::<f32>() / self.similarity_scores.len() as f32
        }
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.retrieval_latency_ms + self.llm_latency_ms
    }

    /// Report metrics to tracing logs
    pub fn report(&self) {
        tracing::info!(
            "Generation metrics: retrieval={}ms, llm={}ms, total={}ms, sources={}, avg_sim={:.2}, sim_range=[{:?},{:?}], tokens={:?}",
            self.retrieval_latency_ms,
            self.llm_latency_ms,
            self.total_latency_ms(),
            self.num_sources,
            self.avg_similarity(),
            self.similarity_min,
            self.similarity_max,
            self.tokens_used,
        );
    }
}

/// Timer helper for measuring operation latency
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = GenerationMetrics::new();
        assert_eq!(metrics.num_sources, 0);
        assert_eq!(metrics.total_latency_ms(), 0);
        assert_eq!(metrics.avg_similarity(), 0.0);
        assert!(metrics.tokens_used.is_none());
    }

    #[test]
    fn test_similarity_scores() {
        let mut metrics = GenerationMetrics::new();
        metrics.set_similarity_scores(vec![0.9, 0.75, 0.8]);

        assert_eq!(metrics.num_sources, 3);
        assert_eq!(metrics.similarity_min, Some(0.75));
        assert_eq!(metrics.similarity_max, Some(0.9));
        assert!((metrics.avg_similarity() - 0.8166).abs() < 1e-3);
    }

    #[test]
    fn test_empty_scores() {
        let mut metrics = GenerationMetrics::new();
        metrics.set_similarity_scores(vec![]);

        assert_eq!(metrics.num_sources, 0);
        assert_eq!(metrics.similarity_min, None);
        assert_eq!(metrics.similarity_max, None);
    }

    #[test]
    fn test_latency_setters() {
        let mut metrics = GenerationMetrics::new();
        metrics.set_retrieval_latency(Duration::from_millis(40));
        metrics.set_llm_latency(Duration::from_millis(900));

        assert_eq!(metrics.retrieval_latency_ms, 40);
        assert_eq!(metrics.llm_latency_ms, 900);
        assert_eq!(metrics.total_latency_ms(), 940);
    }

    #[test]
    fn test_timer() {
        let timer = MetricsTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.stop().as_millis() >= 10);
    }
}
