use anyhow::{Context, Result};
use consultant_core::{Chunk, Document, SamplingConfig};
use consultant_llm::GenerationResult;
use std::path::PathBuf;

pub const DEFAULT_QUERY: &str = "Can I work from a coffee shop?";

/// One sampling configuration under test
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentCase {
    pub label: String,
    pub sampling: SamplingConfig,
}

impl ExperimentCase {
    pub fn new(label: impl Into<String>, temperature: f32, top_p: f32) -> Self {
        Self {
            label: label.into(),
            sampling: SamplingConfig::new(temperature, top_p),
        }
    }
}

/// The query and the cases it is run under
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub query: String,
    pub cases: Vec<ExperimentCase>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            cases: vec![
                // Deterministic
                ExperimentCase::new("A", 0.0, 0.9),
                // Creative
                ExperimentCase::new("B", 0.8, 0.95),
            ],
        }
    }
}

/// The RAG collaborators the experiment drives.
#[allow(async_fn_in_trait)]
pub trait RagToolkit {
    type Embedder;
    type Store;
    type Retriever;

    fn get_embedding_model(&self) -> Result<Self::Embedder>;

    fn load_documents(&self) -> Result<Vec<Document>>;

    fn split_documents(&self, documents: Vec<Document>) -> Result<Vec<Chunk>>;

    fn create_vector_store(&self, chunks: Vec<Chunk>, embedder: &Self::Embedder) -> Result<Self::Store>;

    fn load_vector_store(&self, embedder: &Self::Embedder) -> Result<Self::Store>;

    fn get_retriever(&self, store: Self::Store, embedder: &Self::Embedder) -> Result<Self::Retriever>;

    async fn generate_answer(
        &self,
        query: &str,
        retriever: &Self::Retriever,
        temperature: f32,
        top_p: f32,
    ) -> Result<GenerationResult>;
}

/// Progress callbacks fired while an experiment runs, in order.
pub trait ExperimentObserver {
    fn started(&mut self) -> Result<()> {
        Ok(())
    }

    /// No index was found and one is about to be built
    fn building_index(&mut self) -> Result<()> {
        Ok(())
    }

    /// Setup finished; the cases are about to run
    fn ready(&mut self, _query: &str) -> Result<()> {
        Ok(())
    }

    fn case_started(&mut self, _position: usize, _case: &ExperimentCase) -> Result<()> {
        Ok(())
    }

    fn case_finished(&mut self, _outcome: &CaseOutcome) -> Result<()> {
        Ok(())
    }

    fn finished(&mut self, _report: &ExperimentReport) -> Result<()> {
        Ok(())
    }
}

/// How the index was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSetup {
    Built { documents: usize, chunks: usize },
    Loaded,
}

/// Result of one case; the error is the rendered failure message
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub case: ExperimentCase,
    pub outcome: Result<GenerationResult, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub query: String,
    pub index_setup: IndexSetup,
    pub cases: Vec<CaseOutcome>,
}

impl ExperimentReport {
    pub fn failed_cases(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.is_err()).count()
    }
}

/// Runs every case of an experiment against one index.
pub struct ExperimentRunner {
    index_path: PathBuf,
    config: ExperimentConfig,
}

impl ExperimentRunner {
    pub fn new(index_path: impl Into<PathBuf>, config: ExperimentConfig) -> Self {
        Self {
            index_path: index_path.into(),
            config,
        }
    }

    /// Set up the index and retriever, then run each case in order.
    ///
    /// Setup errors are returned. A failing case is recorded in the report
    /// and the remaining cases still run. `observer` sees each step as it
    /// happens.
    pub async fn run<T: RagToolkit, O: ExperimentObserver>(
        &self,
        toolkit: &T,
        observer: &mut O,
    ) -> Result<ExperimentReport> {
        observer.started()?;

        let embedder = toolkit
            .get_embedding_model()
            .context("Failed to load embedding model")?;

        let (store, index_setup) = if !self.index_path.exists() {
            tracing::info!(
                "No vector index at {}, building from documents",
                self.index_path.display()
            );
            observer.building_index()?;

            let documents = toolkit.load_documents().context("Failed to load documents")?;
            let document_count = documents.len();
            let chunks = toolkit
                .split_documents(documents)
                .context("Failed to split documents")?;
            let chunk_count = chunks.len();
            let store = toolkit
                .create_vector_store(chunks, &embedder)
                .context("Failed to create vector store")?;

            (
                store,
                IndexSetup::Built {
                    documents: document_count,
                    chunks: chunk_count,
                },
            )
        } else {
            let store = toolkit
                .load_vector_store(&embedder)
                .context("Failed to load vector store")?;
            (store, IndexSetup::Loaded)
        };

        let retriever = toolkit
            .get_retriever(store, &embedder)
            .context("Failed to create retriever")?;

        tracing::info!("Test query: '{}'", self.config.query);
        observer.ready(&self.config.query)?;

        let mut cases = Vec::with_capacity(self.config.cases.len());
        for (position, case) in self.config.cases.iter().enumerate() {
            tracing::info!("Running case {} ({})", case.label, case.sampling);
            observer.case_started(position, case)?;

            let outcome = toolkit
                .generate_answer(
                    &self.config.query,
                    &retriever,
                    case.sampling.temperature,
                    case.sampling.top_p,
                )
                .await
                .map_err(|e| {
                    tracing::warn!("Case {} failed: {:#}", case.label, e);
                    format!("{:#}", e)
                });

            let case_outcome = CaseOutcome {
                case: case.clone(),
                outcome,
            };
            observer.case_finished(&case_outcome)?;
            cases.push(case_outcome);
        }

        let report = ExperimentReport {
            query: self.config.query.clone(),
            index_setup,
            cases,
        };
        observer.finished(&report)?;

        Ok(report)
    }
}
