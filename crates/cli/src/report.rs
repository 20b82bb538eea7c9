use anyhow::Result;
use docsift_search::{QueryExpansion, ScoredResult, SearchEngine};
use serde::Serialize;

#[derive(Serialize)]
struct ExpansionReport<'a> {
    query: &'a str,
    variants: &'a [String],
    original_terms: &'a [String],
    expansion_terms: &'a [String],
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_results(engine: &SearchEngine, results: &[ScoredResult]) {
    if results.is_empty() {
        println!("No results");
        return;
    }
    for (rank, result) in results.iter().enumerate() {
        let filename = engine
            .document(&result.document_id)
            .map(|doc| doc.metadata.filename)
            .filter(|name| !name.is_empty());
        match filename {
            Some(name) => println!(
                "{}. {} [{}] (score: {:.3})",
                rank + 1,
                result.document_id,
                name,
                result.final_score
            ),
            None => println!(
                "{}. {} (score: {:.3})",
                rank + 1,
                result.document_id,
                result.final_score
            ),
        }
        let signals: Vec<String> = result
            .signal_breakdown
            .iter()
            .map(|(name, value)| format!("{name}={value:.3}"))
            .collect();
        println!("   {} bm25={:.3}", signals.join(" "), result.keyword_raw);
    }
}

pub fn print_expansion(query: &str, expansion: &QueryExpansion, json: bool) -> Result<()> {
    if json {
        return print_json(&ExpansionReport {
            query,
            variants: expansion.variants(),
            original_terms: expansion.original_terms(),
            expansion_terms: expansion.expansion_terms(),
        });
    }
    println!("Variants:");
    for variant in expansion.variants() {
        println!("  {variant}");
    }
    println!("Terms: {}", expansion.original_terms().join(" "));
    if expansion.is_expanded() {
        println!("Synonyms: {}", expansion.expansion_terms().join(" "));
    }
    Ok(())
}

pub fn print_clusters(clusters: &[Vec<String>], json: bool) -> Result<()> {
    if json {
        return print_json(clusters);
    }
    for (idx, cluster) in clusters.iter().enumerate() {
        println!("Cluster {} ({}): {}", idx + 1, cluster.len(), cluster.join(", "));
    }
    Ok(())
}
