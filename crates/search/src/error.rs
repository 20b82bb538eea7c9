use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] docsift_vector_store::VectorStoreError),

    #[error("Cannot fit keyword statistics on an empty corpus")]
    EmptyCorpus,

    #[error("Empty query")]
    InvalidQuery,

    #[error("Duplicate document id: {0}")]
    DuplicateDocument(String),

    #[error("Invalid ranking profile: {0}")]
    InvalidProfile(String),
}

impl SearchError {
    /// True for a vector dimension disagreement on insert or search.
    #[must_use]
    pub const fn is_dimension_mismatch(&self) -> bool {
        matches!(
            self,
            Self::VectorStoreError(
                docsift_vector_store::VectorStoreError::DimensionMismatch { .. }
            )
        )
    }
}
