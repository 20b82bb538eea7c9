use crate::error::{Result, VectorStoreError};
use crate::similarity::{cosine_with_norms, l2_norm};
use crate::types::{Metadata, StoreStats, VectorMatch, VectorRecord};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

struct Entry {
    id: String,
    vector: Vec<f32>,
    norm: f32,
    metadata: Metadata,
}

/// Exact (brute-force) cosine index.
///
/// Entries are keyed by an insertion sequence number so that iteration, and
/// therefore tie-breaking in [`FlatIndex::search`], follows insertion order.
/// Replacing an id keeps its original sequence number.
#[derive(Default)]
pub(crate) struct FlatIndex {
    dimension: Option<usize>,
    entries: BTreeMap<u64, Entry>,
    slots: HashMap<String, u64>,
    next_seq: u64,
}

impl FlatIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn upsert(
        &mut self,
        id: String,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<bool> {
        if id.is_empty() {
            return Err(VectorStoreError::InvalidId);
        }
        if vector.is_empty() {
            return Err(VectorStoreError::EmptyVector(id));
        }
        let dimension = vector.len();
        self.check_dimension(dimension)?;

        let norm = l2_norm(&vector);
        let entry = Entry {
            id: id.clone(),
            vector,
            norm,
            metadata,
        };

        let replaced = if let Some(seq) = self.slots.get(&id) {
            self.entries.insert(*seq, entry);
            true
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.entries.insert(seq, entry);
            self.slots.insert(id, seq);
            false
        };

        self.dimension.get_or_insert(dimension);
        Ok(replaced)
    }

    /// Validate every record, then apply them all; nothing is written on error.
    pub(crate) fn upsert_batch(&mut self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut expected = self.dimension;
        for record in &records {
            if record.id.is_empty() {
                return Err(VectorStoreError::InvalidId);
            }
            if record.vector.is_empty() {
                return Err(VectorStoreError::EmptyVector(record.id.clone()));
            }
            let actual = record.vector.len();
            match expected {
                Some(expected) if expected != actual => {
                    return Err(VectorStoreError::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
                None => expected = Some(actual),
            }
        }

        let total = records.len();
        for record in records {
            self.upsert(record.id, record.vector, record.metadata)?;
        }
        Ok(total)
    }

    pub(crate) fn delete(&mut self, id: &str) -> bool {
        let Some(seq) = self.slots.remove(id) else {
            return false;
        };
        self.entries.remove(&seq);
        if self.entries.is_empty() {
            self.dimension = None;
        }
        true
    }

    /// Top-k by cosine similarity, descending; ties keep insertion order.
    pub(crate) fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(&Entry, f32)> = self
            .entries
            .values()
            .map(|entry| {
                let score = cosine_with_norms(query, &entry.vector, query_norm, entry.norm);
                (entry, score)
            })
            .collect();

        // `sort_by` is stable, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(entry, score)| VectorMatch {
                id: entry.id.clone(),
                score,
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    pub(crate) fn get(&self, id: &str) -> Option<VectorRecord> {
        let seq = self.slots.get(id)?;
        self.entries.get(seq).map(|entry| VectorRecord {
            id: entry.id.clone(),
            vector: entry.vector.clone(),
            metadata: entry.metadata.clone(),
        })
    }

    pub(crate) fn vector(&self, id: &str) -> Option<&[f32]> {
        let seq = self.slots.get(id)?;
        self.entries.get(seq).map(|entry| entry.vector.as_slice())
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.entries.values().map(|entry| entry.id.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub(crate) fn stats(&self) -> StoreStats {
        StoreStats {
            total_vectors: self.entries.len(),
            dimension: self.dimension,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.dimension = None;
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(VectorStoreError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}
