use anyhow::{Context, Result};
use consultant_core::{Document, RagError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing;

/// File extensions treated as plain-text policy documents
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Load every supported document under `data_dir`, recursively.
///
/// Documents are returned sorted by path so that chunk order (and therefore
/// the persisted index layout) is stable between runs.
pub fn load_documents<P: AsRef<Path>>(data_dir: P) -> Result<Vec<Document>> {
    let data_dir = data_dir.as_ref();

    if !data_dir.is_dir() {
        return Err(RagError::DocumentsNotFound(data_dir.to_path_buf()).into());
    }

    tracing::info!("Loading documents from {}", data_dir.display());

    let mut paths = Vec::new();
    collect_files(data_dir, &mut paths)?;
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document {}", path.display()))?;

        if content.trim().is_empty() {
            tracing::warn!("Skipping empty document: {}", path.display());
            continue;
        }

        let source = path
            .strip_prefix(data_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        tracing::debug!("Loaded {} ({} bytes)", source, content.len());
        documents.push(Document::new(content, source));
    }

    if documents.is_empty() {
        return Err(RagError::NoDocuments(data_dir.to_path_buf()).into());
    }

    tracing::info!("Loaded {} documents", documents.len());
    Ok(documents)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if is_supported(&path) {
            out.push(path);
        }
    }

    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
