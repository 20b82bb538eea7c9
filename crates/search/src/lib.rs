//! Document ranking for file search: BM25 keyword scoring, synonym query
//! expansion and multi-signal reranking over an in-memory corpus.

mod bm25;
mod document;
mod engine;
mod error;
mod profile;
mod query_expansion;
mod rerank;
mod signals;
mod tokenizer;

pub use bm25::{Bm25Params, CorpusStats, KeywordScorer};
pub use document::{parse_timestamp, Corpus, Document, DocumentMetadata, FileCategory};
pub use engine::{SearchEngine, SearchQuery};
pub use error::{Result, SearchError};
pub use profile::RankingProfile;
pub use query_expansion::{
    QueryExpander, QueryExpansion, SynonymTable, DEFAULT_MAX_EXPANSIONS_PER_TERM,
};
pub use rerank::{Reranker, ScoredResult, DEFAULT_MIN_RELEVANCE};
pub use signals::{
    recency_score, signal_table, BatchContext, QueryContext, Signal, SignalFn, SignalKind,
    SignalWeights, DEFAULT_RECENCY_DECAY_DAYS,
};
pub use tokenizer::{tokenize, unique_terms};

pub use docsift_vector_store::{Metadata, VectorMatch, VectorRecord, VectorStore};
