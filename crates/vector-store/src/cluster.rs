use crate::flat_index::FlatIndex;
use crate::similarity::cosine_similarity;
use std::collections::HashSet;

/// Greedy threshold clustering over stored vectors.
///
/// Walks `ids` in order; the first unassigned id with a vector seeds a cluster
/// and every later unassigned id whose cosine similarity to the seed is at
/// least `threshold` joins it. Ids without a stored vector end up as
/// singleton clusters after all seeded clusters.
pub(crate) fn greedy_clusters(
    index: &FlatIndex,
    ids: &[String],
    threshold: f32,
) -> Vec<Vec<String>> {
    let mut clusters = Vec::new();
    let mut processed: HashSet<&str> = HashSet::new();

    for (pos, seed_id) in ids.iter().enumerate() {
        if processed.contains(seed_id.as_str()) {
            continue;
        }
        let Some(seed) = index.vector(seed_id) else {
            continue;
        };

        let mut cluster = vec![seed_id.clone()];
        processed.insert(seed_id.as_str());

        for other_id in &ids[pos + 1..] {
            if processed.contains(other_id.as_str()) {
                continue;
            }
            let Some(other) = index.vector(other_id) else {
                continue;
            };
            if cosine_similarity(seed, other) >= threshold {
                cluster.push(other_id.clone());
                processed.insert(other_id.as_str());
            }
        }
        clusters.push(cluster);
    }

    for id in ids {
        if processed.insert(id.as_str()) {
            clusters.push(vec![id.clone()]);
        }
    }

    log::info!("Clustered {} ids into {} groups", ids.len(), clusters.len());
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use pretty_assertions::assert_eq;

    fn index_with(records: &[(&str, [f32; 2])]) -> FlatIndex {
        let mut index = FlatIndex::new();
        for (id, vector) in records {
            index
                .upsert((*id).to_string(), vector.to_vec(), Metadata::new())
                .unwrap();
        }
        index
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn groups_similar_vectors() {
        let index = index_with(&[
            ("cv_2023", [1.0, 0.05]),
            ("photo", [0.0, 1.0]),
            ("cv_2024", [0.98, 0.1]),
        ]);

        let clusters = greedy_clusters(&index, &ids(&["cv_2023", "photo", "cv_2024"]), 0.9);
        assert_eq!(
            clusters,
            vec![ids(&["cv_2023", "cv_2024"]), ids(&["photo"])]
        );
    }

    #[test]
    fn ids_without_vectors_become_singletons() {
        let index = index_with(&[("a", [1.0, 0.0])]);
        let clusters = greedy_clusters(&index, &ids(&["missing", "a", "missing"]), 0.5);
        assert_eq!(clusters, vec![ids(&["a"]), ids(&["missing"])]);
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        let index = FlatIndex::new();
        assert!(greedy_clusters(&index, &[], 0.7).is_empty());
    }
}
