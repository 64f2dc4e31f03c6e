use serde::{Deserialize, Serialize};

/// A raw policy document loaded from disk, before chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Full text content of the file
    pub content: String,

    /// Path of the file relative to the data directory (or absolute if not under it)
    pub source: String,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// A chunk of a document ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content of this chunk
    pub text: String,

    /// Source document this chunk was cut from
    pub source: String,

    /// Sequential chunk index within the source document (0-based)
    pub chunk_index: usize,

    /// Byte offset of the chunk start within the source document
    pub start_offset: usize,
}

impl Chunk {
    /// Text used for embedding.
    ///
    /// The source name is prepended so that chunks from differently named
    /// policies remain distinguishable when their bodies are similar.
    pub fn to_embedding_text(&self) -> String {
        format!("[{}]\n{}", self.source, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_includes_source() {
        let chunk = Chunk {
            text: "Employees may work remotely up to three days per week.".to_string(),
            source: "remote_work_policy.md".to_string(),
            chunk_index: 0,
            start_offset: 0,
        };

        let text = chunk.to_embedding_text();
        assert!(text.starts_with("[remote_work_policy.md]"));
        assert!(text.ends_with("three days per week."));
    }

    #[test]
    fn test_chunk_serde_roundtrip() {
        let chunk = Chunk {
            text: "Use a VPN on public networks.".to_string(),
            source: "security.txt".to_string(),
            chunk_index: 2,
            start_offset: 1800,
        };

        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
