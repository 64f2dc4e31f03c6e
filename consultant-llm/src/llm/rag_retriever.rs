use anyhow::Result;
use consultant_core::{RagError, Settings};
use consultant_data_services::{Embedder, ScoredChunk, VectorStore};
use moka::future::Cache;
use std::sync::Arc;

/// Query embeddings kept per retriever
const QUERY_CACHE_CAPACITY: u64 = 256;

/// RAG retriever returning the chunks most similar to a query
pub struct RagRetriever<E: Embedder> {
    embedder: Arc<E>,
    vector_store: Arc<VectorStore>,
    top_k: usize,
    query_cache: Cache<String, Arc<Vec<f32>>>,
}

impl<E: Embedder> RagRetriever<E> {
    /// Create a new RAG retriever
    pub fn new(vector_store: Arc<VectorStore>, embedder: Arc<E>, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::Config("retriever top_k must be > 0".to_string()).into());
        }

        if embedder.dimension() != vector_store.metadata().dimension {
            return Err(RagError::DimensionMismatch {
                expected: vector_store.metadata().dimension,
                actual: embedder.dimension(),
            }
            .into());
        }

        tracing::info!(
            "RAG retriever ready: {} chunks, top_k={}, model={}",
            vector_store.len(),
            top_k,
            embedder.model_name()
        );

        Ok(Self {
            embedder,
            vector_store,
            top_k,
            query_cache: Cache::builder().max_capacity(QUERY_CACHE_CAPACITY).build(),
        })
    }

    /// Find the `top_k` chunks most similar to `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = match self.query_cache.get(query).await {
            Some(embedding) => {
                tracing::debug!("Query embedding cache hit");
                embedding
            }
            None => {
                let embedding = Arc::new(self.embedder.embed_query(query)?);
                self.query_cache
                    .insert(query.to_string(), Arc::clone(&embedding))
                    .await;
                embedding
            }
        };

        let matches = self
            .vector_store
            .similarity_search(&query_embedding, self.top_k)?;

        tracing::info!(
            "Retrieved {} chunks (top score: {:.3})",
            matches.len(),
            matches.first().map(|m| m.score).unwrap_or(0.0)
        );
        for m in &matches {
            tracing::debug!(
                "  {} #{} (similarity {:.3})",
                m.chunk.source,
                m.chunk.chunk_index,
                m.score
            );
        }

        Ok(matches)
    }
}

/// Wrap a vector store in a retriever configured by the settings.
pub fn get_retriever<E: Embedder>(
    vector_store: VectorStore,
    embedder: Arc<E>,
    settings: &Settings,
) -> Result<RagRetriever<E>> {
    RagRetriever::new(Arc::new(vector_store), embedder, settings.retriever_top_k)
}
