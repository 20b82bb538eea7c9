use anyhow::{Context, Result};
use docsift_search::Document;
use docsift_vector_store::VectorRecord;
use std::path::Path;

/// Corpus file: a JSON array of documents.
pub async fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read corpus file {}", path.display()))?;
    let documents: Vec<Document> = serde_json::from_slice(&bytes).with_context(|| {
        format!(
            "Corpus file {} is not a JSON array of documents",
            path.display()
        )
    })?;
    log::debug!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

/// Vectors file: a JSON array of `{id, vector, metadata?}`.
pub async fn load_vectors(path: &Path) -> Result<Vec<VectorRecord>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read vectors file {}", path.display()))?;
    let records: Vec<VectorRecord> = serde_json::from_slice(&bytes).with_context(|| {
        format!(
            "Vectors file {} is not a JSON array of {{id, vector, metadata}} records",
            path.display()
        )
    })?;
    log::debug!("Loaded {} vectors from {}", records.len(), path.display());
    Ok(records)
}

/// Load the corpus and, when given, the vectors file concurrently.
pub async fn load_inputs(
    corpus: &Path,
    vectors: Option<&Path>,
) -> Result<(Vec<Document>, Vec<VectorRecord>)> {
    let vectors = async {
        match vectors {
            Some(path) => load_vectors(path).await,
            None => Ok(Vec::new()),
        }
    };
    tokio::try_join!(load_corpus(corpus), vectors)
}
