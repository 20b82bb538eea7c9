use crate::bm25::{CorpusStats, KeywordScorer};
use crate::document::{Corpus, Document};
use crate::error::{Result, SearchError};
use crate::profile::RankingProfile;
use crate::query_expansion::{QueryExpander, QueryExpansion};
use crate::rerank::{Reranker, ScoredResult};
use crate::signals::{BatchContext, QueryContext, SignalWeights};
use chrono::{DateTime, Utc};
use docsift_vector_store::{Metadata, VectorRecord, VectorStore};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One search request. Unset fields fall back to the engine's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: Option<usize>,
    pub min_relevance: Option<f32>,
    pub weights: Option<SignalWeights>,
    /// Query embedding for the semantic signal
    pub vector: Option<Vec<f32>>,
    /// Reference instant for recency; the wall clock when unset
    pub now: Option<DateTime<Utc>>,
    /// Add synonym terms to the keyword query
    pub expand: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: None,
            min_relevance: None,
            weights: None,
            vector: None,
            now: None,
            expand: true,
        }
    }

    #[must_use]
    pub const fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub const fn min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = Some(min_relevance);
        self
    }

    #[must_use]
    pub const fn weights(mut self, weights: SignalWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    #[must_use]
    pub fn vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    #[must_use]
    pub const fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub const fn without_expansion(mut self) -> Self {
        self.expand = false;
        self
    }
}

/// A fitted corpus: replaced wholesale on every `index`.
#[derive(Debug, Default)]
struct IndexSnapshot {
    corpus: Corpus,
    keyword: KeywordScorer,
}

/// End-to-end ranking: expand, score keyword and vector signals, rerank.
///
/// All methods take `&self`. Searches work on the snapshot that was current
/// when they started, so a concurrent `index` never mixes two corpora into
/// one result list.
pub struct SearchEngine {
    profile: RankingProfile,
    expander: QueryExpander,
    reranker: Reranker,
    store: VectorStore,
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl SearchEngine {
    /// Engine with its own empty vector store
    pub fn new(profile: RankingProfile) -> Result<Self> {
        Self::with_vector_store(profile, VectorStore::new())
    }

    /// Engine sharing an existing vector store handle
    pub fn with_vector_store(profile: RankingProfile, store: VectorStore) -> Result<Self> {
        profile
            .validate()
            .map_err(|err| SearchError::InvalidProfile(format!("{err:#}")))?;
        let snapshot = IndexSnapshot {
            corpus: Corpus::default(),
            keyword: profile.keyword_scorer(),
        };
        Ok(Self {
            expander: profile.expander(),
            reranker: profile.reranker(),
            profile,
            store,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Replace the corpus and refit keyword statistics.
    ///
    /// Document embeddings are upserted into the vector store as one batch
    /// before the swap. A dimension mismatch fails the call with neither the
    /// store nor the corpus changed. Stored vectors are never removed here:
    /// a document indexed without an embedding keeps whatever vector its id
    /// already has (for example one added through [`Self::upsert_vector`]),
    /// and [`Self::delete_vector`] drops it. An empty corpus is accepted with
    /// the keyword signal disabled.
    pub fn index(&self, documents: Vec<Document>) -> Result<usize> {
        let corpus = Corpus::new(documents)?;

        let records: Vec<VectorRecord> = corpus
            .documents()
            .iter()
            .filter_map(|doc| {
                let vector = doc.embedding.clone()?;
                let mut record = VectorRecord::new(doc.id.clone(), vector);
                if !doc.metadata.filename.is_empty() {
                    record = record.with_meta("filename", doc.metadata.filename.clone());
                }
                Some(record)
            })
            .collect();
        self.store.upsert_batch(records)?;

        let mut keyword = self.profile.keyword_scorer();
        match keyword.fit(&corpus) {
            Ok(()) => {}
            Err(SearchError::EmptyCorpus) => {
                log::warn!("Indexed an empty corpus; keyword signal disabled");
            }
            Err(err) => return Err(err),
        }

        let count = corpus.len();
        let snapshot = Arc::new(IndexSnapshot { corpus, keyword });
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        log::info!("Indexed {count} documents");
        Ok(count)
    }

    /// Insert or replace one vector in the backing store.
    pub fn upsert_vector(&self, id: &str, vector: Vec<f32>, metadata: Metadata) -> Result<bool> {
        Ok(self.store.upsert(id, vector, metadata)?)
    }

    pub fn delete_vector(&self, id: &str) -> bool {
        self.store.delete(id)
    }

    /// Reject an empty or whitespace-only query.
    pub fn validate_query(query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery);
        }
        Ok(())
    }

    /// Synonym expansion as the engine would apply it
    #[must_use]
    pub fn expand(&self, query: &str) -> QueryExpansion {
        self.expander.expand(query)
    }

    /// Rank the indexed corpus for one query.
    ///
    /// An empty query yields an empty list. Errors when a per-query weight or
    /// `min_relevance` override is out of range, or when the query vector
    /// does not match the store's dimensionality.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<ScoredResult>> {
        Self::validate_overrides(query)?;
        if Self::validate_query(&query.text).is_err() {
            log::debug!("Empty query, returning no results");
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot();
        let documents = snapshot.corpus.documents();
        let expansion = self.expander.expand(&query.text);
        let expansion_terms: &[String] = if query.expand {
            expansion.expansion_terms()
        } else {
            &[]
        };
        log::debug!(
            "Search: query='{}', {} terms, {} expansion terms, {} documents",
            query.text,
            expansion.original_terms().len(),
            expansion_terms.len(),
            documents.len()
        );

        let (keyword_raw, semantic) = rayon::join(
            || self.keyword_scores(&snapshot.keyword, documents, &expansion, expansion_terms),
            || self.semantic_scores(query.vector.as_deref()),
        );
        let semantic = semantic?;

        let context = QueryContext::new(&query.text, query.now.unwrap_or_else(Utc::now))
            .decay_days(self.profile.recency_decay_days());
        let batch = BatchContext::new(keyword_raw, semantic);
        let results = self.reranker_for(query).rerank(documents, &context, &batch);

        log::debug!("Search completed: {} results", results.len());
        Ok(results)
    }

    /// Apply the profile's range checks to per-query overrides.
    fn validate_overrides(query: &SearchQuery) -> Result<()> {
        if let Some((kind, weight)) = query.weights.as_ref().and_then(SignalWeights::invalid) {
            return Err(SearchError::InvalidProfile(format!(
                "weights.{} must be finite and >= 0 (got {weight})",
                kind.name()
            )));
        }
        if let Some(min_relevance) = query.min_relevance {
            if !(0.0..=1.0).contains(&min_relevance) {
                return Err(SearchError::InvalidProfile(format!(
                    "min_relevance must be within [0, 1] (got {min_relevance})"
                )));
            }
        }
        Ok(())
    }

    fn keyword_scores(
        &self,
        scorer: &KeywordScorer,
        documents: &[Document],
        expansion: &QueryExpansion,
        expansion_terms: &[String],
    ) -> HashMap<String, f32> {
        let original = scorer.score_batch(expansion.original_terms(), documents);
        let weight = self.profile.expansion_weight();
        let expanded = if expansion_terms.is_empty() || weight <= 0.0 {
            vec![0.0; documents.len()]
        } else {
            scorer.score_batch(expansion_terms, documents)
        };

        documents
            .iter()
            .zip(original.into_iter().zip(expanded))
            .map(|(doc, (base, extra))| (doc.id.clone(), base + weight * extra))
            .collect()
    }

    fn semantic_scores(&self, vector: Option<&[f32]>) -> Result<HashMap<String, f32>> {
        let Some(vector) = vector else {
            return Ok(HashMap::new());
        };
        let matches = self.store.search(vector, self.store.len())?;
        log::debug!("Semantic: {} results", matches.len());
        Ok(matches.into_iter().map(|m| (m.id, m.score)).collect())
    }

    fn reranker_for(&self, query: &SearchQuery) -> Cow<'_, Reranker> {
        if query.weights.is_none() && query.min_relevance.is_none() && query.top_k.is_none() {
            return Cow::Borrowed(&self.reranker);
        }
        let weights = query.weights.unwrap_or_else(|| self.profile.weights());
        Cow::Owned(
            Reranker::new(&weights)
                .with_min_relevance(query.min_relevance.unwrap_or(self.profile.min_relevance()))
                .with_top_k(query.top_k.or(self.profile.top_k())),
        )
    }

    fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Greedy clusters of the indexed documents by embedding similarity.
    #[must_use]
    pub fn cluster_documents(&self, threshold: f32) -> Vec<Vec<String>> {
        let ids: Vec<String> = self
            .snapshot()
            .corpus
            .documents()
            .iter()
            .map(|doc| doc.id.clone())
            .collect();
        self.store.cluster(&ids, threshold)
    }

    #[must_use]
    pub fn document(&self, id: &str) -> Option<Document> {
        self.snapshot().corpus.get(id).cloned()
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.snapshot().corpus.len()
    }

    #[must_use]
    pub fn keyword_stats(&self) -> Arc<CorpusStats> {
        self.snapshot().keyword.stats()
    }

    #[must_use]
    pub const fn profile(&self) -> &RankingProfile {
        &self.profile
    }

    #[must_use]
    pub const fn vector_store(&self) -> &VectorStore {
        &self.store
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("profile", &self.profile.name())
            .field("documents", &self.document_count())
            .field("vectors", &self.store.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_expansion::SynonymTable;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(RankingProfile::default()).unwrap()
    }

    #[test]
    fn empty_query_returns_nothing() {
        let engine = engine();
        engine
            .index(vec![Document::new("a", "tax").filename("tax.pdf")])
            .unwrap();
        assert!(engine.search(&SearchQuery::new("   ")).unwrap().is_empty());
        assert!(matches!(
            SearchEngine::validate_query(" \t"),
            Err(SearchError::InvalidQuery)
        ));
        assert!(SearchEngine::validate_query("tax").is_ok());
    }

    #[test]
    fn search_before_index_is_empty() {
        let results = engine().search(&SearchQuery::new("tax")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn duplicate_ids_keep_previous_corpus() {
        let engine = engine();
        engine.index(vec![Document::new("a", "one")]).unwrap();
        let err = engine
            .index(vec![Document::new("x", ""), Document::new("x", "")])
            .unwrap_err();
        assert!(matches!(err, SearchError::DuplicateDocument(id) if id == "x"));
        assert_eq!(engine.document_count(), 1);
    }

    #[test]
    fn empty_corpus_is_accepted() {
        let engine = engine();
        engine.index(vec![Document::new("a", "one")]).unwrap();
        assert_eq!(engine.index(Vec::new()).unwrap(), 0);
        assert_eq!(engine.keyword_stats().document_count(), 0);
    }

    #[test]
    fn embeddings_are_upserted_on_index() {
        let engine = engine();
        engine
            .index(vec![
                Document::new("a", "").filename("a.png").embedding(vec![1.0, 0.0]),
                Document::new("b", "").embedding(vec![0.0, 1.0]),
                Document::new("c", ""),
            ])
            .unwrap();
        let store = engine.vector_store();
        assert_eq!(store.ids(), ["a", "b"]);
        let record = store.get("a").unwrap();
        assert_eq!(record.metadata.get("filename"), Some(&serde_json::json!("a.png")));
    }

    #[test]
    fn query_vector_feeds_semantic_signal() {
        let engine = engine();
        engine
            .index(vec![
                Document::new("near", "").embedding(vec![1.0, 0.0]),
                Document::new("far", "").embedding(vec![0.0, 1.0]),
            ])
            .unwrap();

        let results = engine
            .search(&SearchQuery::new("zzz").vector(vec![1.0, 0.1]).now(now()))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, "near");
        assert!(results[0].signal_breakdown["semantic"] > 0.9);

        let err = engine
            .search(&SearchQuery::new("zzz").vector(vec![1.0, 0.0, 0.0]))
            .unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn expansion_weight_scales_synonym_matches() {
        let docs = vec![Document::new("a", "cv attached").modified_at(now() - Duration::days(1))];
        let table = SynonymTable::new().with_entry("resume", ["cv", "bio"]);

        let full =
            SearchEngine::new(RankingProfile::default().with_synonyms(table.clone())).unwrap();
        full.index(docs.clone()).unwrap();
        let found = full.search(&SearchQuery::new("resume").now(now())).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].keyword_raw > 0.0);

        let off = SearchEngine::new(
            RankingProfile::default()
                .with_synonyms(table)
                .with_expansion_weight(0.0),
        )
        .unwrap();
        off.index(docs).unwrap();
        assert!(off.search(&SearchQuery::new("resume").now(now())).unwrap().is_empty());
    }

    #[test]
    fn per_query_overrides_win() {
        let engine = engine();
        engine
            .index(vec![
                Document::new("a", "tax tax").filename("a.pdf"),
                Document::new("b", "tax notes").filename("b.pdf"),
            ])
            .unwrap();
        let base = SearchQuery::new("tax").now(now());
        assert_eq!(engine.search(&base.clone()).unwrap().len(), 2);
        assert_eq!(engine.search(&base.clone().top_k(1)).unwrap().len(), 1);
        assert!(engine
            .search(&base.clone().min_relevance(0.9))
            .unwrap()
            .is_empty());

        let keyword_only = SignalWeights {
            semantic: 0.0,
            keyword: 1.0,
            exact_match: 0.0,
            recency: 0.0,
            file_type: 0.0,
        };
        let results = engine.search(&base.weights(keyword_only)).unwrap();
        assert_eq!(results[0].document_id, "a");
        assert_eq!(results[0].final_score, 1.0);
    }

    #[test]
    fn out_of_range_overrides_are_rejected() {
        let engine = engine();
        engine.index(vec![Document::new("a", "tax")]).unwrap();

        let negative = SignalWeights {
            keyword: -1.0,
            ..RankingProfile::default().weights()
        };
        let err = engine
            .search(&SearchQuery::new("tax").weights(negative))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidProfile(msg) if msg.contains("weights.keyword")));

        let nan = SignalWeights {
            recency: f32::NAN,
            ..RankingProfile::default().weights()
        };
        assert!(engine.search(&SearchQuery::new("tax").weights(nan)).is_err());

        for bad in [-0.1, 1.5, f32::NAN] {
            let err = engine
                .search(&SearchQuery::new("tax").min_relevance(bad))
                .unwrap_err();
            assert!(
                matches!(err, SearchError::InvalidProfile(msg) if msg.contains("min_relevance"))
            );
        }
        assert!(engine
            .search(&SearchQuery::new("   ").min_relevance(2.0))
            .is_err());
        assert!(engine
            .search(&SearchQuery::new("tax").min_relevance(1.0))
            .is_ok());
    }

    #[test]
    fn failed_index_leaves_store_and_corpus_untouched() {
        let engine = engine();
        engine
            .index(vec![Document::new("a", "old").embedding(vec![1.0, 0.0])])
            .unwrap();

        let err = engine
            .index(vec![
                Document::new("a", "new").embedding(vec![0.0, 1.0]),
                Document::new("b", "").embedding(vec![1.0, 0.0, 0.0]),
            ])
            .unwrap_err();
        assert!(err.is_dimension_mismatch());

        assert_eq!(engine.document("a").unwrap().text, "old");
        let store = engine.vector_store();
        assert_eq!(store.get("a").unwrap().vector, vec![1.0, 0.0]);
        assert!(!store.contains("b"));
    }

    #[test]
    fn reindex_without_embedding_keeps_stored_vector() {
        let engine = engine();
        engine
            .upsert_vector("a", vec![1.0, 0.0], Metadata::new())
            .unwrap();
        engine.index(vec![Document::new("a", "notes")]).unwrap();
        assert!(engine.vector_store().contains("a"));

        let results = engine
            .search(&SearchQuery::new("zzz").vector(vec![1.0, 0.0]).now(now()))
            .unwrap();
        assert_eq!(results[0].document_id, "a");
        assert!(results[0].signal_breakdown["semantic"] > 0.99);

        assert!(engine.delete_vector("a"));
        engine.index(vec![Document::new("a", "notes")]).unwrap();
        assert!(engine.vector_store().is_empty());
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let err = SearchEngine::new(RankingProfile::default().with_min_relevance(3.0)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidProfile(msg) if msg.contains("min_relevance")));
    }

    #[test]
    fn clusters_follow_corpus_order() {
        let engine = engine();
        engine
            .index(vec![
                Document::new("a", "").embedding(vec![1.0, 0.0]),
                Document::new("b", "").embedding(vec![0.0, 1.0]),
                Document::new("c", "").embedding(vec![0.99, 0.05]),
                Document::new("d", ""),
            ])
            .unwrap();
        assert_eq!(
            engine.cluster_documents(0.7),
            vec![
                vec!["a".to_string(), "c".to_string()],
                vec!["b".to_string()],
                vec!["d".to_string()],
            ]
        );
    }
}
