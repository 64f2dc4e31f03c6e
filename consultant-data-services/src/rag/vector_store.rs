use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use consultant_core::{Chunk, RagError};
use lmdb::{DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing;

const META_DB: &str = "meta";
const CHUNKS_DB: &str = "chunks";
const META_KEY: &str = "index";
const MAP_SIZE: usize = 1 << 30; // 1 GiB, sparse on disk

/// Metadata persisted alongside the vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub schema_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// One persisted chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query, -1.0 to 1.0
    pub score: f32,
}

/// Vector index persisted as an LMDB environment directory.
///
/// Database structure:
/// - meta: `index` -> JSON `IndexMetadata`
/// - chunks: `chunk:{n:08}` -> JSON `{chunk, embedding}`
///
/// All records are loaded into memory on open; search is exhaustive cosine
/// similarity, which is plenty for a policy handbook.
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    metadata: IndexMetadata,
    records: Vec<StoredChunk>,
}

impl VectorStore {
    /// Whether an index artifact is present at `path`.
    ///
    /// Presence alone is the signal; the contents are not validated.
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists()
    }

    fn make_key(index: usize) -> String {
        format!("chunk:{:08}", index)
    }

    /// Persist chunks and their embeddings at `path`.
    ///
    /// The index is written to a staging directory next to `path` and only
    /// moved into place after the LMDB commit, replacing any index already
    /// there. A failed build leaves `path` untouched.
    pub fn create<P: AsRef<Path>>(
        path: P,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        embedding_model: &str,
    ) -> Result<Self> {
        let path = path.as_ref();

        if chunks.len() != embeddings.len() {
            return Err(RagError::VectorIndex(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            ))
            .into());
        }
        if chunks.is_empty() {
            return Err(RagError::VectorIndex("refusing to create an empty index".to_string()).into());
        }

        let dimension = embeddings[0].len();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            }
            .into());
        }
        // JSON has no NaN or infinity; such a record could never be read back
        if let Some(i) = embeddings.iter().position(|e| e.iter().any(|x| !x.is_finite())) {
            return Err(RagError::VectorIndex(format!(
                "embedding {} contains a non-finite value",
                i
            ))
            .into());
        }

        let metadata = IndexMetadata {
            schema_version: 1,
            embedding_model: embedding_model.to_string(),
            dimension,
            chunk_count: chunks.len(),
            created_at: Utc::now(),
        };

        let records: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk { chunk, embedding })
            .collect();

        let staging = Self::sibling(path, "building")?;
        if staging.exists() {
            tracing::warn!("Removing stale staging index at {}", staging.display());
            fs::remove_dir_all(&staging)
                .with_context(|| format!("Failed to remove {}", staging.display()))?;
        }

        tracing::info!("Creating vector index at: {}", path.display());

        if let Err(e) = Self::write_records(&staging, &metadata, &records) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
        Self::publish(&staging, path)?;

        tracing::info!(
            "Persisted {} chunks (model={}, dimension={})",
            metadata.chunk_count,
            metadata.embedding_model,
            metadata.dimension
        );

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            records,
        })
    }

    /// `.{name}.{suffix}` in the same directory as `path`
    fn sibling(path: &Path, suffix: &str) -> Result<PathBuf> {
        let name = path.file_name().ok_or_else(|| {
            RagError::VectorIndex(format!("invalid index path {}", path.display()))
        })?;
        Ok(path.with_file_name(format!(".{}.{}", name.to_string_lossy(), suffix)))
    }

    fn write_records(dir: &Path, metadata: &IndexMetadata, records: &[StoredChunk]) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

        let env = Environment::new()
            .set_max_dbs(2)
            .set_map_size(MAP_SIZE)
            .open(dir)
            .context("Failed to open LMDB environment")?;

        let meta_db = env
            .create_db(Some(META_DB), DatabaseFlags::empty())
            .context("Failed to create meta database")?;
        let chunks_db = env
            .create_db(Some(CHUNKS_DB), DatabaseFlags::empty())
            .context("Failed to create chunks database")?;

        let mut txn = env.begin_rw_txn().context("Failed to begin write transaction")?;
        for (i, record) in records.iter().enumerate() {
            let value = serde_json::to_vec(record).context("Failed to serialize chunk")?;
            txn.put(chunks_db, &Self::make_key(i), &value, WriteFlags::empty())
                .map_err(|e| anyhow!("LMDB write error: {}", e))?;
        }
        let meta_value = serde_json::to_vec(metadata).context("Failed to serialize metadata")?;
        txn.put(meta_db, &META_KEY, &meta_value, WriteFlags::empty())
            .map_err(|e| anyhow!("LMDB write error: {}", e))?;
        txn.commit().context("Failed to commit vector index")?;

        Ok(())
    }

    /// Move a committed staging directory to `path`, swapping out an old index.
    fn publish(staging: &Path, path: &Path) -> Result<()> {
        if !path.exists() {
            return fs::rename(staging, path)
                .with_context(|| format!("Failed to move index into {}", path.display()));
        }

        let previous = Self::sibling(path, "previous")?;
        if previous.exists() {
            fs::remove_dir_all(&previous)
                .with_context(|| format!("Failed to remove {}", previous.display()))?;
        }
        fs::rename(path, &previous)
            .with_context(|| format!("Failed to move aside old index {}", path.display()))?;

        if let Err(e) = fs::rename(staging, path) {
            // Put the old index back so the path still holds a readable index
            let _ = fs::rename(&previous, path);
            let _ = fs::remove_dir_all(staging);
            return Err(anyhow!("Failed to move index into {}: {}", path.display(), e));
        }

        if let Err(e) = fs::remove_dir_all(&previous) {
            tracing::warn!("Failed to remove old index {}: {}", previous.display(), e);
        }
        Ok(())
    }

    /// Open an existing index read-only and load it into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RagError::IndexNotFound(path.to_path_buf()).into());
        }

        tracing::info!("Opening vector index read-only at: {}", path.display());

        let env = Environment::new()
            .set_max_dbs(2)
            .set_flags(EnvironmentFlags::READ_ONLY)
            .open(path)
            .context("Failed to open LMDB environment")?;

        let meta_db = env
            .open_db(Some(META_DB))
            .context("Failed to open meta database")?;
        let chunks_db = env
            .open_db(Some(CHUNKS_DB))
            .context("Failed to open chunks database")?;

        let txn = env.begin_ro_txn().context("Failed to begin read transaction")?;

        let metadata: IndexMetadata = match txn.get(meta_db, &META_KEY) {
            Ok(bytes) => serde_json::from_slice(bytes).context("Failed to deserialize index metadata")?,
            Err(lmdb::Error::NotFound) => {
                return Err(RagError::VectorIndex("index metadata missing".to_string()).into())
            }
            Err(e) => return Err(anyhow!("LMDB read error: {}", e)),
        };

        let mut records = Vec::with_capacity(metadata.chunk_count);
        for i in 0..metadata.chunk_count {
            let key = Self::make_key(i);
            match txn.get(chunks_db, &key) {
                Ok(bytes) => {
                    let record: StoredChunk = serde_json::from_slice(bytes)
                        .with_context(|| format!("Failed to deserialize {}", key))?;
                    records.push(record);
                }
                Err(lmdb::Error::NotFound) => {
                    return Err(RagError::VectorIndex(format!("missing record {}", key)).into())
                }
                Err(e) => return Err(anyhow!("LMDB read error: {}", e)),
            }
        }
        drop(txn);

        tracing::info!(
            "Loaded {} chunks (model={}, created {})",
            records.len(),
            metadata.embedding_model,
            metadata.created_at.to_rfc3339()
        );

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Return at most `k` chunks ordered by descending cosine similarity.
    pub fn similarity_search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query_vector.len() != self.metadata.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.metadata.dimension,
                actual: query_vector.len(),
            }
            .into());
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(query_vector, &r.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.records[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: "policy.md".to_string(),
            chunk_index: index,
            start_offset: index * 100,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_create_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        let store = VectorStore::create(
            &path,
            vec![chunk("remote work", 0), chunk("expenses", 1)],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            "test-model",
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert!(VectorStore::exists(&path));
        drop(store);

        let reopened = VectorStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.metadata().embedding_model, "test-model");
        assert_eq!(reopened.metadata().dimension, 3);
        assert_eq!(reopened.metadata().chunk_count, 2);

        let hits = reopened.similarity_search(&[0.1, 0.9, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "expenses");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::create(
            dir.path().join("index"),
            (0..5).map(|i| chunk("text", i)).collect(),
            (0..5).map(|i| vec![1.0, i as f32]).collect(),
            "test-model",
        )
        .unwrap();

        assert_eq!(store.similarity_search(&[1.0, 0.0], 3).unwrap().len(), 3);
        assert_eq!(store.similarity_search(&[1.0, 0.0], 10).unwrap().len(), 5);
        assert!(store.similarity_search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::create(
            dir.path().join("index"),
            vec![chunk("text", 0)],
            vec![vec![1.0, 0.0]],
            "test-model",
        )
        .unwrap();

        let err = store.similarity_search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_create_rejects_inconsistent_input() {
        let dir = tempfile::tempdir().unwrap();

        assert!(VectorStore::create(
            dir.path().join("a"),
            vec![chunk("one", 0)],
            vec![],
            "test-model"
        )
        .is_err());

        assert!(VectorStore::create(
            dir.path().join("b"),
            vec![chunk("one", 0), chunk("two", 1)],
            vec![vec![1.0, 0.0], vec![1.0]],
            "test-model"
        )
        .is_err());

        assert!(VectorStore::create(dir.path().join("c"), vec![], vec![], "test-model").is_err());
    }

    #[test]
    fn test_create_rejects_non_finite_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        for bad in [f32::NAN, f32::INFINITY] {
            let err = VectorStore::create(
                &path,
                vec![chunk("one", 0), chunk("two", 1)],
                vec![vec![1.0, 0.0], vec![bad, 1.0]],
                "test-model",
            )
            .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<RagError>(),
                Some(RagError::VectorIndex(_))
            ));
            assert!(!VectorStore::exists(&path));
        }
    }

    #[test]
    fn test_create_replaces_existing_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        VectorStore::create(
            &path,
            vec![chunk("old one", 0), chunk("old two", 1)],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            "old-model",
        )
        .unwrap();
        VectorStore::create(&path, vec![chunk("new", 0)], vec![vec![1.0, 1.0]], "new-model").unwrap();

        let reopened = VectorStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.metadata().embedding_model, "new-model");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["index".to_string()]);
    }

    #[test]
    fn test_stale_staging_dir_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let staging = dir.path().join(".index.building");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("data.mdb"), b"half-written").unwrap();

        VectorStore::create(&path, vec![chunk("text", 0)], vec![vec![1.0, 0.0]], "test-model").unwrap();

        assert!(!staging.exists());
        assert_eq!(VectorStore::open(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_write_leaves_no_index() {
        let dir = tempfile::tempdir().unwrap();
        // The parent is a regular file, so the staging directory cannot be created
        let parent = dir.path().join("not_a_dir");
        fs::write(&parent, b"").unwrap();
        let path = parent.join("index");

        assert!(VectorStore::create(&path, vec![chunk("text", 0)], vec![vec![1.0, 0.0]], "test-model").is_err());
        assert!(!VectorStore::exists(&path));
    }

    #[test]
    fn test_open_missing_index() {
        let err = VectorStore::open("/path/that/does/not/exist").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::IndexNotFound(_))
        ));
    }
}
