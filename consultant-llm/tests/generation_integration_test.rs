/// Generation integration tests
///
/// These tests verify that retrieval, prompt formatting and the chat model
/// are wired together correctly:
/// - Retriever ranks policy chunks and caches query embeddings
/// - Generator forwards sampling parameters untouched
/// - Sources and metrics are attached to the result
/// - Model failures propagate to the caller
use anyhow::{anyhow, Result};
use consultant_core::{Chunk, RagError, SamplingConfig, Settings};
use consultant_data_services::{Embedder, VectorStore};
use consultant_llm::llm::get_retriever;
use consultant_llm::{AnswerGenerator, ChatModel, LlmResponse, RagRetriever};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const VOCABULARY: &[&str] = &["remote", "coffee", "vpn", "expense", "travel", "leave"];

/// Counts vocabulary hits and how many times it was called.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Records every prompt and sampling config it receives.
#[derive(Default)]
struct RecordingModel {
    calls: Mutex<Vec<(String, SamplingConfig)>>,
    fail: bool,
}

impl ChatModel for RecordingModel {
    async fn complete(&self, prompt: &str, sampling: SamplingConfig) -> Result<LlmResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), sampling));

        if self.fail {
            return Err(RagError::Llm("OpenAI API error: 401 invalid api key".to_string()).into());
        }

        Ok(LlmResponse {
            raw_response: "Yes, per remote work policy you may work from a coffee shop [1].".to_string(),
            model: "stub".to_string(),
            tokens_used: Some(42),
        })
    }
}

fn policy_chunks() -> Vec<Chunk> {
    let texts = [
        ("remote_work.md", "Remote work from a coffee shop is allowed with the VPN enabled."),
        ("expenses.md", "Travel expense claims are due within 30 days."),
        ("leave.md", "Annual leave requests need two weeks notice."),
    ];
    texts
        .iter()
        .map(|(source, text)| Chunk {
            text: text.to_string(),
            source: source.to_string(),
            chunk_index: 0,
            start_offset: 0,
        })
        .collect()
}

fn build_store(dir: &tempfile::TempDir, embedder: &KeywordEmbedder) -> VectorStore {
    let chunks = policy_chunks();
    let embeddings = embedder
        .embed(chunks.iter().map(|c| c.to_embedding_text()).collect())
        .unwrap();
    VectorStore::create(dir.path().join("index"), chunks, embeddings, embedder.model_name()).unwrap()
}

fn build_retriever(dir: &tempfile::TempDir, top_k: usize) -> (RagRetriever<KeywordEmbedder>, Arc<KeywordEmbedder>) {
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = build_store(dir, &embedder);
    let settings = Settings {
        retriever_top_k: top_k,
        ..Settings::default()
    };
    let retriever = get_retriever(store, Arc::clone(&embedder), &settings).unwrap();
    (retriever, embedder)
}

#[tokio::test]
async fn test_retriever_ranks_relevant_policy_first() {
    let dir = tempfile::tempdir().unwrap();
    let (retriever, _) = build_retriever(&dir, 2);

    let hits = retriever.retrieve("Can I work from a coffee shop?").await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.source, "remote_work.md");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn test_query_embedding_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (retriever, embedder) = build_retriever(&dir, 2);
    let calls_after_build = embedder.calls.load(Ordering::SeqCst);

    retriever.retrieve("Can I work from a coffee shop?").await.unwrap();
    retriever.retrieve("Can I work from a coffee shop?").await.unwrap();
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_build + 1);

    retriever.retrieve("How do I claim travel expenses?").await.unwrap();
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_build + 2);
}

#[test]
fn test_zero_top_k_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = Arc::new(build_store(&dir, &embedder));

    let err = RagRetriever::new(store, embedder, 0).err().expect("top_k 0 must fail");
    assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::Config(_))));
}

#[test]
fn test_embedder_dimension_must_match_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::create(
        dir.path().join("index"),
        vec![policy_chunks().remove(0)],
        vec![vec![1.0, 0.0]],
        "other-model",
    )
    .unwrap();

    let err = RagRetriever::new(Arc::new(store), Arc::new(KeywordEmbedder::default()), 3)
        .err()
        .expect("dimension mismatch must fail");
    assert!(matches!(
        err.downcast_ref::<RagError>(),
        Some(RagError::DimensionMismatch { expected: 2, actual: 6 })
    ));
}

#[tokio::test]
async fn test_generate_answer_forwards_sampling_and_sources() {
    let dir = tempfile::tempdir().unwrap();
    let (retriever, _) = build_retriever(&dir, 2);
    let generator = AnswerGenerator::new(RecordingModel::default());

    let result = generator
        .generate_answer("Can I work from a coffee shop?", &retriever, 0.8, 0.95)
        .await
        .unwrap();

    assert!(result.result.starts_with("Yes, per remote work policy"));
    assert_eq!(result.source_documents.len(), 2);
    assert_eq!(result.source_documents[0].chunk.source, "remote_work.md");
    assert_eq!(result.metrics.num_sources, 2);
    assert_eq!(result.metrics.tokens_used, Some(42));

    let generator_model_calls = generator_calls(&generator);
    assert_eq!(generator_model_calls.len(), 1);
    let (prompt, sampling) = &generator_model_calls[0];
    assert_eq!(*sampling, SamplingConfig::new(0.8, 0.95));
    assert!(prompt.contains("QUESTION: Can I work from a coffee shop?"));
    assert!(prompt.contains("Remote work from a coffee shop is allowed"));
}

#[tokio::test]
async fn test_model_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let (retriever, _) = build_retriever(&dir, 2);
    let generator = AnswerGenerator::new(RecordingModel {
        fail: true,
        ..Default::default()
    });

    let err = generator
        .generate_answer("Can I work from a coffee shop?", &retriever, 0.0, 0.9)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid api key"));
}

#[tokio::test]
async fn test_retrieval_failure_has_context() {
    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn model_name(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> usize {
            VOCABULARY.len()
        }
        fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Err(anyhow!("onnx session poisoned"))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let store = build_store(&dir, &KeywordEmbedder::default());
    let retriever = RagRetriever::new(Arc::new(store), Arc::new(BrokenEmbedder), 2).unwrap();
    let generator = AnswerGenerator::new(RecordingModel::default());

    let err = generator
        .generate_answer("anything", &retriever, 0.0, 0.9)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Retrieval failed");
    assert!(format!("{:#}", err).contains("onnx session poisoned"));
}

fn generator_calls(generator: &AnswerGenerator<RecordingModel>) -> Vec<(String, SamplingConfig)> {
    generator.model().calls.lock().unwrap().clone()
}
