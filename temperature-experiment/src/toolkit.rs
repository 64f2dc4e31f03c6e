use anyhow::Result;
use consultant_core::{Chunk, Document, Settings};
use consultant_data_services::rag::{self, ChunkingConfig};
use consultant_data_services::{FastEmbedder, VectorStore};
use consultant_llm::llm::get_retriever;
use consultant_llm::{AnswerGenerator, GenerationResult, LlmClient, RagRetriever};
use std::sync::Arc;

use crate::runner::RagToolkit;

/// fastembed, the on-disk index and the OpenAI-compatible client, configured from `Settings`
pub struct ConsultantToolkit {
    settings: Settings,
    generator: AnswerGenerator<LlmClient>,
}

impl ConsultantToolkit {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = LlmClient::from_settings(&settings)?;
        Ok(Self {
            settings,
            generator: AnswerGenerator::new(client),
        })
    }
}

impl RagToolkit for ConsultantToolkit {
    type Embedder = Arc<FastEmbedder>;
    type Store = VectorStore;
    type Retriever = RagRetriever<FastEmbedder>;

    fn get_embedding_model(&self) -> Result<Self::Embedder> {
        Ok(Arc::new(rag::get_embedding_model(&self.settings)?))
    }

    fn load_documents(&self) -> Result<Vec<Document>> {
        rag::load_documents(&self.settings.data_dir)
    }

    fn split_documents(&self, documents: Vec<Document>) -> Result<Vec<Chunk>> {
        rag::split_documents(&documents, &ChunkingConfig::from_settings(&self.settings))
    }

    fn create_vector_store(&self, chunks: Vec<Chunk>, embedder: &Self::Embedder) -> Result<Self::Store> {
        let (store, stats) =
            rag::create_vector_store(&self.settings.index_path, chunks, embedder.as_ref())?;
        tracing::info!(
            "Vector index created at {}: {} chunks, {} embeddings",
            self.settings.index_path.display(),
            stats.chunks_created,
            stats.embeddings_generated
        );
        Ok(store)
    }

    fn load_vector_store(&self, embedder: &Self::Embedder) -> Result<Self::Store> {
        rag::load_vector_store(&self.settings.index_path, embedder.as_ref())
    }

    fn get_retriever(&self, store: Self::Store, embedder: &Self::Embedder) -> Result<Self::Retriever> {
        get_retriever(store, Arc::clone(embedder), &self.settings)
    }

    async fn generate_answer(
        &self,
        query: &str,
        retriever: &Self::Retriever,
        temperature: f32,
        top_p: f32,
    ) -> Result<GenerationResult> {
        self.generator
            .generate_answer(query, retriever, temperature, top_p)
            .await
    }
}
