//! # docsift vector store
//!
//! In-memory vector storage with exact cosine-similarity search.
//!
//! ## Features
//!
//! - **Upsert / delete** by string id, with free-form metadata per record
//! - **Fixed dimensionality** per store, established by the first insert
//! - **Deterministic top-k**: ties are broken by insertion order
//! - **Single writer, many readers** via a shared `RwLock`
//! - **Greedy clustering** of stored vectors by similarity threshold
//!
//! ## Architecture
//!
//! ```text
//! VectorStore (Arc<RwLock<..>> handle)
//!     │
//!     └──> FlatIndex
//!            ├─> seq → (id, vector, norm, metadata)
//!            └─> linear scan, O(N·D) per search
//! ```
//!
//! The linear scan is the scaling limit; an approximate index can replace
//! `FlatIndex` behind the same `search` contract.
//!
//! ## Example
//!
//! ```
//! use docsift_vector_store::{Metadata, VectorStore};
//!
//! # fn main() -> docsift_vector_store::Result<()> {
//! let store = VectorStore::new();
//! store.upsert("cv.pdf", vec![0.9, 0.1, 0.0], Metadata::new())?;
//! store.upsert("photo.png", vec![0.0, 1.0, 0.0], Metadata::new())?;
//!
//! let hits = store.search(&[1.0, 0.0, 0.0], 1)?;
//! assert_eq!(hits[0].id, "cv.pdf");
//! # Ok(())
//! # }
//! ```

mod cluster;
mod error;
mod flat_index;
mod similarity;
mod store;
mod types;

pub use error::{Result, VectorStoreError};
pub use similarity::{cosine_similarity, dot, l2_norm};
pub use store::VectorStore;
pub use types::{Metadata, StoreStats, VectorMatch, VectorRecord};
