use crate::document::Document;
use crate::signals::{signal_table, BatchContext, QueryContext, Signal, SignalKind, SignalWeights};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Results scoring below this are dropped
pub const DEFAULT_MIN_RELEVANCE: f32 = 0.15;

/// One ranked document.
///
/// `final_score` equals the weighted sum of `signal_breakdown` using the
/// weights the ranking ran with; signals that did not apply are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub document_id: String,
    pub final_score: f32,
    pub signal_breakdown: BTreeMap<String, f32>,
    /// Un-normalized BM25 score, including weighted expansion terms
    pub keyword_raw: f32,
}

impl ScoredResult {
    #[must_use]
    pub fn signal(&self, kind: SignalKind) -> Option<f32> {
        self.signal_breakdown.get(kind.name()).copied()
    }
}

#[derive(Debug)]
struct Candidate<'a> {
    position: usize,
    doc: &'a Document,
    signals: Vec<(Signal, f32)>,
    final_score: f32,
}

impl Candidate<'_> {
    fn value(&self, kind: SignalKind) -> f32 {
        self.signals
            .iter()
            .find(|(signal, _)| signal.kind == kind)
            .map_or(0.0, |(_, value)| *value)
    }
}

/// Fuses per-document signals into a filtered, ordered result list.
#[derive(Debug, Clone)]
pub struct Reranker {
    signals: Vec<Signal>,
    min_relevance: f32,
    top_k: Option<usize>,
}

impl Default for Reranker {
    fn default() -> Self {
        Self::new(&SignalWeights::default())
    }
}

impl Reranker {
    #[must_use]
    pub fn new(weights: &SignalWeights) -> Self {
        Self {
            signals: signal_table(weights),
            min_relevance: DEFAULT_MIN_RELEVANCE,
            top_k: None,
        }
    }

    #[must_use]
    pub const fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    #[must_use]
    pub const fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn weights(&self) -> SignalWeights {
        self.signals
            .iter()
            .fold(SignalWeights::default(), |weights, signal| {
                weights.with(signal.kind, signal.weight)
            })
    }

    #[must_use]
    pub const fn min_relevance(&self) -> f32 {
        self.min_relevance
    }

    #[must_use]
    pub const fn top_k(&self) -> Option<usize> {
        self.top_k
    }

    /// Rank `documents` (given in corpus order) for one query.
    #[must_use]
    pub fn rerank(
        &self,
        documents: &[Document],
        query: &QueryContext,
        batch: &BatchContext,
    ) -> Vec<ScoredResult> {
        if documents.is_empty() || self.top_k == Some(0) {
            return Vec::new();
        }

        let candidates = self.collect(documents, query, batch);
        let candidates = fuse(candidates);
        let total = candidates.len();
        let mut kept = self.filter(candidates);
        log::debug!(
            "Rerank: {} of {} candidates above {:.2}",
            kept.len(),
            total,
            self.min_relevance
        );

        sort_candidates(&mut kept);
        if let Some(top_k) = self.top_k {
            kept.truncate(top_k);
        }

        kept.into_iter()
            .map(|candidate| into_result(candidate, batch))
            .collect()
    }

    fn collect<'a>(
        &self,
        documents: &'a [Document],
        query: &QueryContext,
        batch: &BatchContext,
    ) -> Vec<Candidate<'a>> {
        documents
            .iter()
            .enumerate()
            .map(|(position, doc)| Candidate {
                position,
                doc,
                signals: self
                    .signals
                    .iter()
                    .filter_map(|signal| Some((*signal, signal.evaluate(doc, query, batch)?)))
                    .collect(),
                final_score: 0.0,
            })
            .collect()
    }

    /// Drops scores under the threshold and anything that scored nothing at all.
    fn filter<'a>(&self, candidates: Vec<Candidate<'a>>) -> Vec<Candidate<'a>> {
        candidates
            .into_iter()
            .filter(|c| c.final_score > 0.0 && c.final_score >= self.min_relevance)
            .collect()
    }
}

fn fuse(mut candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    for candidate in &mut candidates {
        candidate.final_score = candidate
            .signals
            .iter()
            .map(|(signal, value)| signal.weight * value)
            .sum();
    }
    candidates
}

fn sort_candidates(candidates: &mut [Candidate<'_>]) {
    candidates.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| {
                b.value(SignalKind::ExactMatch)
                    .total_cmp(&a.value(SignalKind::ExactMatch))
            })
            .then_with(|| newer_first(a.doc.modified_time(), b.doc.modified_time()))
            .then_with(|| a.position.cmp(&b.position))
    });
}

fn newer_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn into_result(candidate: Candidate<'_>, batch: &BatchContext) -> ScoredResult {
    ScoredResult {
        document_id: candidate.doc.id.clone(),
        final_score: candidate.final_score,
        signal_breakdown: candidate
            .signals
            .iter()
            .map(|(signal, value)| (signal.kind.name().to_string(), *value))
            .collect(),
        keyword_raw: batch.keyword_raw(&candidate.doc.id),
    }
}
