use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::bm25::{Bm25Params, KeywordScorer};
use crate::query_expansion::{QueryExpander, SynonymTable, DEFAULT_MAX_EXPANSIONS_PER_TERM};
use crate::rerank::{Reranker, DEFAULT_MIN_RELEVANCE};
use crate::signals::{SignalWeights, DEFAULT_RECENCY_DECAY_DAYS};

const BUNDLED_DEFAULT: &str = include_str!("../profiles/default.json");

/// Every tunable of the ranking pipeline under one name.
///
/// Loaded from the bundled `default` profile with an optional user file laid
/// over it field by field, or built in code from [`RankingProfile::default`]
/// with the `with_*` setters.
#[derive(Clone, Debug, PartialEq)]
pub struct RankingProfile {
    name: String,
    description: Option<String>,
    bm25: Bm25Params,
    synonyms: SynonymTable,
    max_expansions_per_term: usize,
    weights: SignalWeights,
    min_relevance: f32,
    top_k: Option<usize>,
    expansion_weight: f32,
    recency_decay_days: f32,
}

impl Default for RankingProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: None,
            bm25: Bm25Params::default(),
            synonyms: SynonymTable::builtin(),
            max_expansions_per_term: DEFAULT_MAX_EXPANSIONS_PER_TERM,
            weights: SignalWeights::default(),
            min_relevance: DEFAULT_MIN_RELEVANCE,
            top_k: None,
            expansion_weight: 1.0,
            recency_decay_days: DEFAULT_RECENCY_DECAY_DAYS,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    schema_version: Option<u32>,
    name: Option<String>,
    description: Option<String>,
    bm25: Option<RawBm25>,
    synonyms: Option<RawSynonyms>,
    weights: Option<RawWeights>,
    filter: Option<RawFilter>,
    expansion_weight: Option<f32>,
    recency: Option<RawRecency>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawBm25 {
    k1: Option<f32>,
    b: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawSynonyms {
    replace_builtin: Option<bool>,
    max_expansions_per_term: Option<usize>,
    #[serde(default)]
    groups: Vec<Vec<String>>,
    #[serde(default)]
    entries: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawWeights {
    semantic: Option<f32>,
    keyword: Option<f32>,
    exact_match: Option<f32>,
    recency: Option<f32>,
    file_type: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawFilter {
    min_relevance: Option<f32>,
    top_k: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawRecency {
    decay_days: Option<f32>,
}

impl RankingProfile {
    /// The bundled `default` profile.
    pub fn bundled() -> Result<Self> {
        let raw = parse_raw(BUNDLED_DEFAULT.as_bytes())
            .context("Bundled default profile is invalid")?;
        Self::from_raw(raw, "default")
    }

    /// Load a JSON or TOML profile and lay it over the bundled default.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read profile file {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("custom");
        Self::from_bytes(name, &bytes)
            .with_context(|| format!("Invalid profile file {}", path.display()))
    }

    pub fn from_bytes(profile_name: &str, bytes: &[u8]) -> Result<Self> {
        let raw = parse_raw(bytes).with_context(|| {
            format!("Profile '{profile_name}' is not valid JSON/TOML configuration")
        })?;
        let base = parse_raw(BUNDLED_DEFAULT.as_bytes())
            .context("Bundled default profile is invalid")?;
        Self::from_raw(merge_raw_profiles(base, raw), profile_name)
    }

    fn from_raw(raw: RawProfile, fallback_name: &str) -> Result<Self> {
        if let Some(schema_version) = raw.schema_version {
            if schema_version != 1 {
                return Err(anyhow!(
                    "profile.schema_version {schema_version} is not supported (expected 1)"
                ));
            }
        }

        let defaults = Self::default();
        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let bm25 = raw.bm25.unwrap_or_default();
        let bm25 = Bm25Params {
            k1: bm25.k1.unwrap_or(defaults.bm25.k1),
            b: bm25.b.unwrap_or(defaults.bm25.b),
        };

        let synonyms = raw.synonyms.unwrap_or_default();
        let max_expansions_per_term = synonyms
            .max_expansions_per_term
            .unwrap_or(defaults.max_expansions_per_term);
        let mut table = if synonyms.replace_builtin.unwrap_or(false) {
            SynonymTable::new()
        } else {
            SynonymTable::builtin()
        };
        table.extend(SynonymTable::from_groups(synonyms.groups));
        for (canonical, terms) in synonyms.entries {
            table.insert(canonical, terms);
        }

        let weights = raw.weights.unwrap_or_default();
        let weights = SignalWeights {
            semantic: weights.semantic.unwrap_or(defaults.weights.semantic),
            keyword: weights.keyword.unwrap_or(defaults.weights.keyword),
            exact_match: weights.exact_match.unwrap_or(defaults.weights.exact_match),
            recency: weights.recency.unwrap_or(defaults.weights.recency),
            file_type: weights.file_type.unwrap_or(defaults.weights.file_type),
        };

        let filter = raw.filter.unwrap_or_default();
        let recency = raw.recency.unwrap_or_default();

        let profile = Self {
            name,
            description: raw.description,
            bm25,
            synonyms: table,
            max_expansions_per_term,
            weights,
            min_relevance: filter.min_relevance.unwrap_or(defaults.min_relevance),
            top_k: filter.top_k,
            expansion_weight: raw.expansion_weight.unwrap_or(defaults.expansion_weight),
            recency_decay_days: recency.decay_days.unwrap_or(defaults.recency_decay_days),
        };
        profile
            .validate()
            .with_context(|| format!("Invalid values in profile '{}'", profile.name))?;
        Ok(profile)
    }

    /// Check value ranges; errors name the offending key.
    pub fn validate(&self) -> Result<()> {
        if let Some((kind, weight)) = self.weights.invalid() {
            return Err(anyhow!(
                "weights.{} must be finite and >= 0 (got {weight})",
                kind.name()
            ));
        }
        if !self.bm25.k1.is_finite() || self.bm25.k1 < 0.0 {
            return Err(anyhow!("bm25.k1 must be finite and >= 0 (got {})", self.bm25.k1));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(anyhow!("bm25.b must be within [0, 1] (got {})", self.bm25.b));
        }
        if !(0.0..=1.0).contains(&self.min_relevance) {
            return Err(anyhow!(
                "filter.min_relevance must be within [0, 1] (got {})",
                self.min_relevance
            ));
        }
        if !self.expansion_weight.is_finite() || self.expansion_weight < 0.0 {
            return Err(anyhow!(
                "expansion_weight must be finite and >= 0 (got {})",
                self.expansion_weight
            ));
        }
        if !self.recency_decay_days.is_finite() || self.recency_decay_days <= 0.0 {
            return Err(anyhow!(
                "recency.decay_days must be > 0 (got {})",
                self.recency_decay_days
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn bm25(&self) -> Bm25Params {
        self.bm25
    }

    #[must_use]
    pub const fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    #[must_use]
    pub const fn max_expansions_per_term(&self) -> usize {
        self.max_expansions_per_term
    }

    #[must_use]
    pub const fn weights(&self) -> SignalWeights {
        self.weights
    }

    #[must_use]
    pub const fn min_relevance(&self) -> f32 {
        self.min_relevance
    }

    #[must_use]
    pub const fn top_k(&self) -> Option<usize> {
        self.top_k
    }

    #[must_use]
    pub const fn expansion_weight(&self) -> f32 {
        self.expansion_weight
    }

    #[must_use]
    pub const fn recency_decay_days(&self) -> f32 {
        self.recency_decay_days
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub const fn with_bm25(mut self, bm25: Bm25Params) -> Self {
        self.bm25 = bm25;
        self
    }

    #[must_use]
    pub fn with_synonyms(mut self, table: SynonymTable) -> Self {
        self.synonyms = table;
        self
    }

    #[must_use]
    pub const fn with_max_expansions_per_term(mut self, max: usize) -> Self {
        self.max_expansions_per_term = max;
        self
    }

    #[must_use]
    pub const fn with_weights(mut self, weights: SignalWeights) -> Self {
        self.weights = weights;
        self
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
    pub const fn with_expansion_weight(mut self, weight: f32) -> Self {
        self.expansion_weight = weight;
        self
    }

    #[must_use]
    pub const fn with_recency_decay_days(mut self, days: f32) -> Self {
        self.recency_decay_days = days;
        self
    }

    #[must_use]
    pub fn expander(&self) -> QueryExpander {
        QueryExpander::new(&self.synonyms).max_expansions_per_term(self.max_expansions_per_term)
    }

    #[must_use]
    pub fn keyword_scorer(&self) -> KeywordScorer {
        KeywordScorer::new(self.bm25)
    }

    #[must_use]
    pub fn reranker(&self) -> Reranker {
        Reranker::new(&self.weights)
            .with_min_relevance(self.min_relevance)
            .with_top_k(self.top_k)
    }
}

fn merge_raw_profiles(base: RawProfile, overlay: RawProfile) -> RawProfile {
    let bm25 = match (base.bm25, overlay.bm25) {
        (Some(base_cfg), Some(overlay_cfg)) => Some(RawBm25 {
            k1: overlay_cfg.k1.or(base_cfg.k1),
            b: overlay_cfg.b.or(base_cfg.b),
        }),
        (base_cfg, overlay_cfg) => overlay_cfg.or(base_cfg),
    };

    let synonyms = match (base.synonyms, overlay.synonyms) {
        (Some(base_cfg), Some(overlay_cfg)) => Some(merge_synonyms_raw(base_cfg, overlay_cfg)),
        (base_cfg, overlay_cfg) => overlay_cfg.or(base_cfg),
    };

    let weights = match (base.weights, overlay.weights) {
        (Some(base_cfg), Some(overlay_cfg)) => Some(RawWeights {
            semantic: overlay_cfg.semantic.or(base_cfg.semantic),
            keyword: overlay_cfg.keyword.or(base_cfg.keyword),
            exact_match: overlay_cfg.exact_match.or(base_cfg.exact_match),
            recency: overlay_cfg.recency.or(base_cfg.recency),
            file_type: overlay_cfg.file_type.or(base_cfg.file_type),
        }),
        (base_cfg, overlay_cfg) => overlay_cfg.or(base_cfg),
    };

    let filter = match (base.filter, overlay.filter) {
        (Some(base_cfg), Some(overlay_cfg)) => Some(RawFilter {
            min_relevance: overlay_cfg.min_relevance.or(base_cfg.min_relevance),
            top_k: overlay_cfg.top_k.or(base_cfg.top_k),
        }),
        (base_cfg, overlay_cfg) => overlay_cfg.or(base_cfg),
    };

    let recency = match (base.recency, overlay.recency) {
        (Some(base_cfg), Some(overlay_cfg)) => Some(RawRecency {
            decay_days: overlay_cfg.decay_days.or(base_cfg.decay_days),
        }),
        (base_cfg, overlay_cfg) => overlay_cfg.or(base_cfg),
    };

    RawProfile {
        schema_version: overlay.schema_version.or(base.schema_version),
        // The overlay's profile name (or the caller's fallback) wins over "default".
        name: overlay.name,
        description: overlay.description.or(base.description),
        bm25,
        synonyms,
        weights,
        filter,
        expansion_weight: overlay.expansion_weight.or(base.expansion_weight),
        recency,
    }
}

fn merge_synonyms_raw(mut base: RawSynonyms, overlay: RawSynonyms) -> RawSynonyms {
    base.replace_builtin = overlay.replace_builtin.or(base.replace_builtin);
    base.max_expansions_per_term = overlay
        .max_expansions_per_term
        .or(base.max_expansions_per_term);
    base.groups.extend(overlay.groups);
    base.entries.extend(overlay.entries);
    base
}

fn parse_raw(bytes: &[u8]) -> Result<RawProfile> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                anyhow!(
                    "Profile is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                )
            })?;
            serde_json::to_value(toml_value)
                .map_err(|err| anyhow!("Failed to convert TOML profile to JSON: {err}"))?
        }
    };

    validate_profile_value(&value)?;
    serde_json::from_value(value).map_err(|err| anyhow!("Profile parse error: {err}"))
}

fn validate_profile_value(value: &serde_json::Value) -> Result<()> {
    fn validate_object_keys(
        unknown: &mut Vec<String>,
        root: &serde_json::Map<String, serde_json::Value>,
        section: &str,
        allowed: &[&str],
    ) {
        let Some(serde_json::Value::Object(obj)) = root.get(section) else {
            return;
        };
        for key in obj.keys() {
            if !allowed.contains(&key.as_str()) {
                unknown.push(format!("{section}.{key}"));
            }
        }
    }

    let serde_json::Value::Object(root) = value else {
        return Err(anyhow!("Profile config must be a JSON object"));
    };

    let mut unknown: Vec<String> = root
        .keys()
        .filter(|key| {
            ![
                "schema_version",
                "name",
                "description",
                "bm25",
                "synonyms",
                "weights",
                "filter",
                "expansion_weight",
                "recency",
            ]
            .contains(&key.as_str())
        })
        .cloned()
        .collect();

    validate_object_keys(&mut unknown, root, "bm25", &["k1", "b"]);
    validate_object_keys(
        &mut unknown,
        root,
        "synonyms",
        &["replace_builtin", "max_expansions_per_term", "groups", "entries"],
    );
    validate_object_keys(
        &mut unknown,
        root,
        "weights",
        &["semantic", "keyword", "exact_match", "recency", "file_type"],
    );
    validate_object_keys(&mut unknown, root, "filter", &["min_relevance", "top_k"]);
    validate_object_keys(&mut unknown, root, "recency", &["decay_days"]);

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "Profile config has unknown fields: {}",
            unknown.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bundled_matches_programmatic_default() {
        let bundled = RankingProfile::bundled().unwrap();
        let defaults = RankingProfile::default();
        assert_eq!(bundled.name(), "default");
        assert!(bundled.description().is_some());
        assert_eq!(bundled.bm25(), defaults.bm25());
        assert_eq!(bundled.weights(), defaults.weights());
        assert_eq!(bundled.synonyms(), defaults.synonyms());
        assert_eq!(bundled.max_expansions_per_term(), 3);
        assert_eq!(bundled.min_relevance(), 0.15);
        assert_eq!(bundled.top_k(), None);
        assert_eq!(bundled.expansion_weight(), 1.0);
        assert_eq!(bundled.recency_decay_days(), 30.0);
    }

    #[test]
    fn overlay_replaces_only_given_fields() {
        let profile = RankingProfile::from_bytes(
            "strict",
            br#"{ "weights": { "recency": 0.5 }, "filter": { "top_k": 5 } }"#,
        )
        .unwrap();
        assert_eq!(profile.name(), "strict");
        assert_eq!(profile.weights().recency, 0.5);
        assert_eq!(profile.weights().exact_match, 0.40);
        assert_eq!(profile.top_k(), Some(5));
        assert_eq!(profile.min_relevance(), 0.15);
    }

    #[test]
    fn toml_profiles_are_accepted() {
        let profile = RankingProfile::from_bytes(
            "toml",
            br#"
            name = "legal"
            expansion_weight = 0.5

            [bm25]
            k1 = 1.2

            [synonyms]
            replace_builtin = true
            groups = [["contract", "agreement", "deed"]]
            "#,
        )
        .unwrap();
        assert_eq!(profile.name(), "legal");
        assert_eq!(profile.expansion_weight(), 0.5);
        assert_eq!(profile.bm25().k1, 1.2);
        assert_eq!(profile.bm25().b, 0.75);

        let expander = profile.expander();
        assert_eq!(
            expander.expand("deed").expansion_terms(),
            ["contract", "agreement"]
        );
        assert!(!expander.expand("resume").is_expanded());
    }

    #[test]
    fn synonym_entries_extend_builtin_table() {
        let profile = RankingProfile::from_bytes(
            "custom",
            br#"{ "synonyms": { "entries": { "payslip": ["paystub"] } } }"#,
        )
        .unwrap();
        let expander = profile.expander();
        assert_eq!(expander.expand("paystub").expansion_terms(), ["payslip"]);
        assert!(expander.expand("resume").is_expanded());
    }

    #[test]
    fn profile_rejects_unknown_fields_with_paths() {
        let bytes = br#"
        {
          "weights": { "semantic": 0.3, "popularity": 0.1 },
          "bm25": { "k3": 2.0 },
          "boosts": {}
        }
        "#;
        let err = RankingProfile::from_bytes("custom", bytes).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("weights.popularity"), "{msg}");
        assert!(msg.contains("bm25.k3"), "{msg}");
        assert!(msg.contains("boosts"), "{msg}");
    }

    #[test]
    fn profile_rejects_unsupported_schema_version() {
        let err =
            RankingProfile::from_bytes("custom", br#"{ "schema_version": 999 }"#).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("profile.schema_version"), "{msg}");
    }

    #[test]
    fn out_of_range_values_name_the_key() {
        for (text, key) in [
            (r#"{ "weights": { "keyword": -1.0 } }"#, "weights.keyword"),
            (r#"{ "bm25": { "b": 1.5 } }"#, "bm25.b"),
            (r#"{ "bm25": { "k1": -0.1 } }"#, "bm25.k1"),
            (r#"{ "filter": { "min_relevance": 2.0 } }"#, "filter.min_relevance"),
            (r#"{ "recency": { "decay_days": 0 } }"#, "recency.decay_days"),
            (r#"{ "expansion_weight": -0.5 }"#, "expansion_weight"),
        ] {
            let err = RankingProfile::from_bytes("custom", text.as_bytes()).unwrap_err();
            let msg = format!("{err:#}");
            assert!(msg.contains(key), "{msg}");
        }
    }

    #[test]
    fn from_file_uses_file_stem_as_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photos.toml");
        std::fs::write(&path, "[weights]\nfile_type = 0.2\n").unwrap();

        let profile = RankingProfile::from_file(&path).unwrap();
        assert_eq!(profile.name(), "photos");
        assert_eq!(profile.weights().file_type, 0.2);

        let missing = RankingProfile::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(format!("{missing:#}").contains("nope.json"));
    }

    #[test]
    fn builder_setters_feed_components() {
        let profile = RankingProfile::default()
            .with_min_relevance(0.0)
            .with_top_k(Some(3))
            .with_bm25(Bm25Params { k1: 1.2, b: 0.5 })
            .with_max_expansions_per_term(1);
        assert!(profile.validate().is_ok());

        let reranker = profile.reranker();
        assert_eq!(reranker.min_relevance(), 0.0);
        assert_eq!(reranker.top_k(), Some(3));
        assert_eq!(profile.keyword_scorer().params().k1, 1.2);
        assert_eq!(profile.expander().expand("invoice").expansion_terms(), ["bill"]);

        let invalid = RankingProfile::default().with_recency_decay_days(-3.0);
        assert!(invalid.validate().is_err());
    }
}
