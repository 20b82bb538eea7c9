use crate::cluster::greedy_clusters;
use crate::error::Result;
use crate::flat_index::FlatIndex;
use crate::types::{Metadata, StoreStats, VectorMatch, VectorRecord};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared in-memory vector store.
///
/// Cloning is cheap and every clone sees the same records. Writes
/// (`upsert`, `delete`, `clear`) take the write lock; `search` and the other
/// readers share the read lock, so searches never observe a half-applied
/// write.
#[derive(Clone, Default)]
pub struct VectorStore {
    inner: Arc<RwLock<FlatIndex>>,
}

impl VectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Returns `true` when an existing id was replaced.
    pub fn upsert(
        &self,
        id: impl Into<String>,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<bool> {
        let id = id.into();
        let replaced = self.write().upsert(id.clone(), vector, metadata)?;
        if replaced {
            log::debug!("Replaced vector for '{id}'");
        } else {
            log::debug!("Stored vector for '{id}'");
        }
        Ok(replaced)
    }

    pub fn upsert_record(&self, record: VectorRecord) -> Result<bool> {
        self.upsert(record.id, record.vector, record.metadata)
    }

    /// Upsert many records under one write lock.
    ///
    /// All-or-nothing: every record is validated first, and an invalid one
    /// fails the call without writing any of them.
    pub fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut index = self.write();
        let total = index.upsert_batch(records)?;
        log::info!("Upserted {total} vectors. Total: {}", index.len());
        Ok(total)
    }

    /// Remove a record; absent ids are a no-op. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.write().delete(id);
        if removed {
            log::debug!("Deleted vector for '{id}'");
        }
        removed
    }

    /// Top-k records by cosine similarity to `query`, best first.
    ///
    /// Equal scores are returned in insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        log::debug!("Vector search (dim={}, top_k={top_k})", query.len());
        let results = self.read().search(query, top_k)?;
        log::debug!("Found {} results", results.len());
        Ok(results)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.read().get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains(id)
    }

    /// All ids in insertion order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.read().ids()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.read().dimension()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.read().stats()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Group `ids` by vector similarity (see the crate docs for the algorithm).
    #[must_use]
    pub fn cluster(&self, ids: &[String], threshold: f32) -> Vec<Vec<String>> {
        greedy_clusters(&self.read(), ids, threshold)
    }

    fn read(&self) -> RwLockReadGuard<'_, FlatIndex> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FlatIndex> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("VectorStore")
            .field("total_vectors", &stats.total_vectors)
            .field("dimension", &stats.dimension)
            .finish()
    }
}
