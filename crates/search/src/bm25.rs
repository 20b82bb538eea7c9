//! Okapi BM25 keyword scoring over a fitted corpus.

use crate::document::{Corpus, Document};
use crate::error::{Result, SearchError};
use crate::tokenizer::{tokenize, unique_terms};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Document length normalization
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Term-frequency table of one fitted document.
#[derive(Debug, Default)]
struct DocTerms {
    len: usize,
    tf: HashMap<String, u32>,
}

impl DocTerms {
    fn from_text(text: &str) -> Self {
        let tokens = tokenize(text);
        let mut tf = HashMap::new();
        for token in &tokens {
            *tf.entry(token.clone()).or_insert(0) += 1;
        }
        Self {
            len: tokens.len(),
            tf,
        }
    }

    fn frequency(&self, term: &str) -> f32 {
        self.tf.get(term).copied().unwrap_or(0) as f32
    }
}

/// Immutable corpus statistics produced by [`KeywordScorer::fit`].
#[derive(Debug, Default)]
pub struct CorpusStats {
    document_count: usize,
    avg_doc_len: f32,
    doc_freq: HashMap<String, usize>,
    docs: HashMap<String, DocTerms>,
}

impl CorpusStats {
    #[must_use]
    pub const fn document_count(&self) -> usize {
        self.document_count
    }

    #[must_use]
    pub const fn avg_doc_len(&self) -> f32 {
        self.avg_doc_len
    }

    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.doc_freq.len()
    }

    #[must_use]
    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }
}

/// BM25 scorer.
///
/// `fit` builds a fresh [`CorpusStats`] and swaps it in; clones of the scorer
/// (and queries already holding one) keep the snapshot they started with.
#[derive(Debug, Clone, Default)]
pub struct KeywordScorer {
    params: Bm25Params,
    stats: Arc<CorpusStats>,
}

impl KeywordScorer {
    #[must_use]
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            stats: Arc::new(CorpusStats::default()),
        }
    }

    #[must_use]
    pub const fn params(&self) -> Bm25Params {
        self.params
    }

    #[must_use]
    pub fn stats(&self) -> Arc<CorpusStats> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.stats.document_count > 0
    }

    /// Replace the corpus statistics.
    ///
    /// Ids in a [`Corpus`] are unique, so every document is counted once.
    /// On an empty corpus the previous statistics are dropped as well, so
    /// every later score is 0 until the next successful fit.
    pub fn fit(&mut self, corpus: &Corpus) -> Result<()> {
        let documents = corpus.documents();
        if documents.is_empty() {
            self.stats = Arc::new(CorpusStats::default());
            return Err(SearchError::EmptyCorpus);
        }

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut docs = HashMap::with_capacity(documents.len());
        let mut total_len = 0usize;

        for doc in documents {
            let terms = DocTerms::from_text(&doc.text);
            total_len += terms.len;
            for term in terms.tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            docs.insert(doc.id.clone(), terms);
        }

        let document_count = documents.len();
        let stats = CorpusStats {
            document_count,
            avg_doc_len: total_len as f32 / document_count as f32,
            doc_freq,
            docs,
        };
        log::info!(
            "BM25 fitted: {} documents, {} terms, avg length {:.1}",
            stats.document_count,
            stats.vocabulary_size(),
            stats.avg_doc_len
        );
        self.stats = Arc::new(stats);
        Ok(())
    }

    /// Smoothed IDF; `None` for terms the fitted corpus never saw.
    #[must_use]
    pub fn idf(&self, term: &str) -> Option<f32> {
        let df = *self.stats.doc_freq.get(term)?;
        Some(bm25_idf(self.stats.document_count as f32, df as f32))
    }

    /// Score `query` against `document`.
    ///
    /// A document that was part of the fit uses its fitted term table; any
    /// other document is tokenized on the fly against the current statistics.
    #[must_use]
    pub fn score(&self, query: &str, document: &Document) -> f32 {
        self.score_terms(&unique_terms(query), document)
    }

    /// Score an already tokenized term list. Repeated terms count once.
    #[must_use]
    pub fn score_terms(&self, terms: &[String], document: &Document) -> f32 {
        if terms.is_empty() || !self.is_fitted() {
            return 0.0;
        }
        match self.stats.docs.get(&document.id) {
            Some(fitted) => self.score_table(terms, fitted),
            None => self.score_table(terms, &DocTerms::from_text(&document.text)),
        }
    }

    /// Score a fitted document by id; unknown ids score 0.
    #[must_use]
    pub fn score_by_id(&self, query: &str, id: &str) -> f32 {
        let terms = unique_terms(query);
        self.stats
            .docs
            .get(id)
            .map_or(0.0, |fitted| self.score_table(&terms, fitted))
    }

    /// Score every document, in parallel, preserving input order.
    #[must_use]
    pub fn score_batch(&self, terms: &[String], documents: &[Document]) -> Vec<f32> {
        documents
            .par_iter()
            .map(|doc| self.score_terms(terms, doc))
            .collect()
    }

    fn score_table(&self, terms: &[String], doc: &DocTerms) -> f32 {
        if doc.len == 0 {
            return 0.0;
        }
        let total_docs = self.stats.document_count as f32;
        let avg_len = self.stats.avg_doc_len.max(f32::EPSILON);
        let dl = doc.len as f32;
        let Bm25Params { k1, b } = self.params;

        let mut seen = HashSet::with_capacity(terms.len());
        let mut score = 0.0;
        for term in terms {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let Some(&df) = self.stats.doc_freq.get(term) else {
                continue;
            };
            let freq = doc.frequency(term);
            if freq <= 0.0 {
                continue;
            }
            let idf = bm25_idf(total_docs, df as f32);
            let denom = freq + k1 * (1.0 - b + b * dl / avg_len);
            if denom > 0.0 {
                score += idf * (freq * (k1 + 1.0)) / denom;
            }
        }
        score
    }
}

fn bm25_idf(total_docs: f32, df: f32) -> f32 {
    ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln()
}
