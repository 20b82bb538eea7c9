use crate::document::Document;
use crate::tokenizer::unique_terms;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Age in days at which the recency signal drops to 0.5
pub const DEFAULT_RECENCY_DECAY_DAYS: f32 = 30.0;

const SECONDS_PER_DAY: f32 = 86_400.0;

/// The ranking signals, in fusion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Semantic,
    Keyword,
    ExactMatch,
    Recency,
    FileType,
}

impl SignalKind {
    pub const ALL: [Self; 5] = [
        Self::Semantic,
        Self::Keyword,
        Self::ExactMatch,
        Self::Recency,
        Self::FileType,
    ];

    /// Key used in score breakdowns and profiles
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Keyword => "keyword",
            Self::ExactMatch => "exact_match",
            Self::Recency => "recency",
            Self::FileType => "file_type",
        }
    }

    const fn compute_fn(self) -> SignalFn {
        match self {
            Self::Semantic => semantic_signal,
            Self::Keyword => keyword_signal,
            Self::ExactMatch => exact_match_signal,
            Self::Recency => recency_signal,
            Self::FileType => file_type_signal,
        }
    }
}

/// Per-signal fusion weights. Not renormalized when a signal is absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub semantic: f32,
    pub keyword: f32,
    pub exact_match: f32,
    pub recency: f32,
    pub file_type: f32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            semantic: 0.25,
            keyword: 0.25,
            exact_match: 0.40,
            recency: 0.08,
            file_type: 0.02,
        }
    }
}

impl SignalWeights {
    #[must_use]
    pub const fn get(&self, kind: SignalKind) -> f32 {
        match kind {
            SignalKind::Semantic => self.semantic,
            SignalKind::Keyword => self.keyword,
            SignalKind::ExactMatch => self.exact_match,
            SignalKind::Recency => self.recency,
            SignalKind::FileType => self.file_type,
        }
    }

    #[must_use]
    pub const fn with(mut self, kind: SignalKind, weight: f32) -> Self {
        match kind {
            SignalKind::Semantic => self.semantic = weight,
            SignalKind::Keyword => self.keyword = weight,
            SignalKind::ExactMatch => self.exact_match = weight,
            SignalKind::Recency => self.recency = weight,
            SignalKind::FileType => self.file_type = weight,
        }
        self
    }

    /// First weight that is negative or not finite
    #[must_use]
    pub fn invalid(&self) -> Option<(SignalKind, f32)> {
        SignalKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .find(|(_, weight)| !weight.is_finite() || *weight < 0.0)
    }
}

/// Query-level inputs shared by every candidate.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Trimmed, lowercased query text
    normalized: String,
    /// Distinct terms of the query as written
    terms: Vec<String>,
    now: DateTime<Utc>,
    decay_days: f32,
}

impl QueryContext {
    #[must_use]
    pub fn new(query: &str, now: DateTime<Utc>) -> Self {
        Self {
            normalized: query.trim().to_lowercase(),
            terms: unique_terms(query),
            now,
            decay_days: DEFAULT_RECENCY_DECAY_DAYS,
        }
    }

    #[must_use]
    pub const fn decay_days(mut self, days: f32) -> Self {
        self.decay_days = days;
        self
    }

    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Scores computed once per query over the whole candidate batch.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    keyword_raw: HashMap<String, f32>,
    keyword_max: f32,
    semantic: HashMap<String, f32>,
}

impl BatchContext {
    /// `keyword_raw`: BM25 per document id. `semantic`: vector similarity per id.
    #[must_use]
    pub fn new(keyword_raw: HashMap<String, f32>, semantic: HashMap<String, f32>) -> Self {
        let keyword_max = keyword_raw
            .values()
            .copied()
            .filter(|s| s.is_finite())
            .fold(0.0_f32, f32::max);
        Self {
            keyword_raw,
            keyword_max,
            semantic,
        }
    }

    #[must_use]
    pub fn keyword_raw(&self, id: &str) -> f32 {
        self.keyword_raw
            .get(id)
            .copied()
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
    }

    #[must_use]
    pub const fn keyword_max(&self) -> f32 {
        self.keyword_max
    }

    #[must_use]
    pub fn semantic(&self, id: &str) -> Option<f32> {
        self.semantic.get(id).copied()
    }
}

/// Computes one signal in [0, 1]; `None` means the signal does not apply.
pub type SignalFn = fn(&Document, &QueryContext, &BatchContext) -> Option<f32>;

/// One row of the fusion table.
#[derive(Clone, Copy)]
pub struct Signal {
    pub kind: SignalKind,
    pub weight: f32,
    pub compute: SignalFn,
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("kind", &self.kind)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

impl Signal {
    /// Run the signal, clamping to [0, 1]. Non-finite output counts as 0.
    #[must_use]
    pub fn evaluate(
        &self,
        doc: &Document,
        query: &QueryContext,
        batch: &BatchContext,
    ) -> Option<f32> {
        (self.compute)(doc, query, batch).map(unit)
    }
}

/// The fusion table in [`SignalKind::ALL`] order.
#[must_use]
pub fn signal_table(weights: &SignalWeights) -> Vec<Signal> {
    SignalKind::ALL
        .into_iter()
        .map(|kind| Signal {
            kind,
            weight: weights.get(kind),
            compute: kind.compute_fn(),
        })
        .collect()
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Store similarity for this query wins over a precomputed one.
fn semantic_signal(doc: &Document, _query: &QueryContext, batch: &BatchContext) -> Option<f32> {
    batch.semantic(&doc.id).or(doc.similarity)
}

fn keyword_signal(doc: &Document, _query: &QueryContext, batch: &BatchContext) -> Option<f32> {
    let max = batch.keyword_max();
    if max <= 0.0 {
        return Some(0.0);
    }
    Some(batch.keyword_raw(&doc.id) / max)
}

fn exact_match_signal(doc: &Document, query: &QueryContext, _batch: &BatchContext) -> Option<f32> {
    let needle = query.normalized();
    if needle.is_empty() || doc.metadata.filename.is_empty() {
        return Some(0.0);
    }
    let hit = doc.metadata.filename.to_lowercase().contains(needle);
    Some(if hit { 1.0 } else { 0.0 })
}

fn recency_signal(doc: &Document, query: &QueryContext, _batch: &BatchContext) -> Option<f32> {
    let Some(stamp) = doc.modified_time().or_else(|| doc.created_time()) else {
        return Some(0.0);
    };
    Some(recency_score(stamp, query.now(), query.decay_days))
}

fn file_type_signal(doc: &Document, query: &QueryContext, _batch: &BatchContext) -> Option<f32> {
    let Some(category) = doc.file_category() else {
        return Some(0.0);
    };
    let vocabulary = category.query_terms();
    let hit = query
        .terms()
        .iter()
        .any(|term| vocabulary.contains(&term.as_str()));
    Some(if hit { 1.0 } else { 0.0 })
}

/// `1 / (1 + age_days / decay_days)`; timestamps in the future have age 0.
#[must_use]
pub fn recency_score(stamp: DateTime<Utc>, now: DateTime<Utc>, decay_days: f32) -> f32 {
    if decay_days.is_nan() || decay_days <= 0.0 {
        return 0.0;
    }
    let age_secs = now.signed_duration_since(stamp).num_seconds().max(0);
    let age_days = age_secs as f32 / SECONDS_PER_DAY;
    unit(1.0 / (1.0 + age_days / decay_days))
}
