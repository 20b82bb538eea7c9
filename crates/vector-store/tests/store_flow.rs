use docsift_vector_store::{Metadata, VectorRecord, VectorStore, VectorStoreError};
use pretty_assertions::assert_eq;

fn store_with(records: &[(&str, [f32; 4])]) -> VectorStore {
    let store = VectorStore::new();
    for (id, vector) in records {
        store.upsert(*id, vector.to_vec(), Metadata::new()).unwrap();
    }
    store
}

#[test]
fn top_k_returns_exactly_k_in_descending_order() {
    let store = store_with(&[
        ("far", [0.0, 0.0, 1.0, 0.0]),
        ("near", [1.0, 0.1, 0.0, 0.0]),
        ("mid", [1.0, 1.0, 0.0, 0.0]),
    ]);

    let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "near");
    assert_eq!(hits[1].id, "mid");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn second_upsert_replaces_first() {
    let store = VectorStore::new();
    store
        .upsert("doc", vec![1.0, 0.0, 0.0, 0.0], Metadata::new())
        .unwrap();
    let replaced = store
        .upsert("doc", vec![0.0, 1.0, 0.0, 0.0], Metadata::new())
        .unwrap();
    assert!(replaced);
    assert_eq!(store.len(), 1);

    let hits = store.search(&[0.0, 1.0, 0.0, 0.0], 1).unwrap();
    assert_eq!(hits[0].id, "doc");
    assert!((hits[0].score - 1.0).abs() < 1e-6);

    let old = store.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
    assert!(old[0].score.abs() < 1e-6);
}

#[test]
fn delete_is_idempotent() {
    let store = store_with(&[("a", [1.0, 0.0, 0.0, 0.0])]);
    assert!(store.delete("a"));
    assert!(!store.delete("a"));
    assert!(!store.delete("never-existed"));
    assert!(store.is_empty());
}

#[test]
fn query_dimension_must_match_store() {
    let store = store_with(&[("a", [1.0, 0.0, 0.0, 0.0])]);
    let err = store.search(&[1.0, 0.0], 1).unwrap_err();
    assert_eq!(
        err,
        VectorStoreError::DimensionMismatch {
            expected: 4,
            actual: 2
        }
    );
}

#[test]
fn zero_query_scores_zero_everywhere() {
    let store = store_with(&[
        ("a", [1.0, 0.0, 0.0, 0.0]),
        ("b", [0.0, 0.0, 0.0, 0.0]),
    ]);
    let hits = store.search(&[0.0; 4], 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.score == 0.0));
    // Ties fall back to insertion order.
    assert_eq!(hits[0].id, "a");
}

#[test]
fn stats_and_ids_follow_store_contents() {
    let store = VectorStore::new();
    assert_eq!(store.stats().dimension, None);

    store
        .upsert_batch(vec![
            VectorRecord::new("x", vec![1.0, 2.0, 3.0, 4.0]),
            VectorRecord::new("y", vec![4.0, 3.0, 2.0, 1.0]),
        ])
        .unwrap();

    let stats = store.stats();
    assert_eq!(stats.total_vectors, 2);
    assert_eq!(stats.dimension, Some(4));
    assert_eq!(store.ids(), vec!["x", "y"]);
}

#[test]
fn cluster_groups_near_duplicates() {
    let store = store_with(&[
        ("invoice_jan", [1.0, 0.0, 0.0, 0.1]),
        ("holiday", [0.0, 1.0, 0.0, 0.0]),
        ("invoice_feb", [1.0, 0.0, 0.05, 0.1]),
    ]);
    let ids = store.ids();
    let clusters = store.cluster(&ids, 0.95);
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0], vec!["invoice_jan", "invoice_feb"]);
}
