use anyhow::Result;
use consultant_core::{Chunk, Document, RagError, Settings};
use text_splitter::{ChunkConfig, TextSplitter};
use tracing;

/// Chunk sizing, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }

    fn splitter(&self) -> Result<TextSplitter<text_splitter::Characters>, RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidChunking(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidChunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| RagError::InvalidChunking(e.to_string()))?;

        Ok(TextSplitter::new(config))
    }
}

/// Split documents into overlapping chunks, preferring paragraph, line,
/// sentence and word boundaries in that order.
pub fn split_documents(documents: &[Document], config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let splitter = config.splitter()?;
    let mut chunks = Vec::new();

    for document in documents {
        let before = chunks.len();

        for (chunk_index, (start_offset, text)) in
            splitter.chunk_indices(&document.content).enumerate()
        {
            chunks.push(Chunk {
                text: text.to_string(),
                source: document.source.clone(),
                chunk_index,
                start_offset,
            });
        }

        tracing::debug!(
            "Split {} into {} chunks",
            document.source,
            chunks.len() - before
        );
    }

    tracing::info!(
        "Split {} documents into {} chunks (size={}, overlap={})",
        documents.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}
