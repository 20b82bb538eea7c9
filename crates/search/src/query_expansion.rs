use crate::tokenizer::{dedup_terms, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default cap on synonyms added per matched query term
pub const DEFAULT_MAX_EXPANSIONS_PER_TERM: usize = 3;

/// Synonym groups from the file search domain, each stored as a full group.
const BUILTIN_GROUPS: &[&[&str]] = &[
    &["resume", "cv", "curriculum vitae", "bio"],
    &["photo", "image", "picture", "pic"],
    &["document", "doc", "file", "paper"],
    &["invoice", "bill", "receipt"],
    &["contract", "agreement", "terms"],
    &["report", "summary", "analysis"],
    &["presentation", "slides", "deck"],
    &["spreadsheet", "excel", "sheet", "data"],
    &["tax", "taxes", "1040", "w2"],
    &["assignment", "homework", "hw", "problem set"],
    &["project", "proposal", "plan"],
    &["headshot", "portrait", "profile photo"],
];

/// Canonical term -> interchangeable terms.
///
/// Lookup is symmetric: an entry `a: [b, c]` lets `a` expand to `b` and `c`,
/// and lets `b` and `c` expand back to `a`. It does not relate `b` to `c`
/// unless an entry says so; [`SynonymTable::from_groups`] writes one entry per
/// group member to get full groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynonymTable {
    entries: Vec<(String, Vec<String>)>,
}

impl SynonymTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in file search synonyms
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_groups(
            BUILTIN_GROUPS
                .iter()
                .map(|group| group.iter().map(|s| (*s).to_string()).collect()),
        )
    }

    /// Every member of a group becomes interchangeable with every other member.
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut table = Self::new();
        for group in groups {
            for (pos, member) in group.iter().enumerate() {
                let others: Vec<String> = group
                    .iter()
                    .enumerate()
                    .filter(|(other_pos, _)| *other_pos != pos)
                    .map(|(_, other)| other.clone())
                    .collect();
                table.insert(member.clone(), others);
            }
        }
        table
    }

    /// Add an entry. Terms are normalized the way query text is.
    pub fn insert<I, S>(&mut self, canonical: impl Into<String>, synonyms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = normalize_phrase(&canonical.into());
        if canonical.is_empty() {
            return;
        }
        let synonyms: Vec<String> = synonyms
            .into_iter()
            .map(|s| normalize_phrase(&s.into()))
            .filter(|s| !s.is_empty() && *s != canonical)
            .collect();
        if !synonyms.is_empty() {
            self.entries.push((canonical, synonyms));
        }
    }

    /// Builder: add an entry
    #[must_use]
    pub fn with_entry<I, S>(mut self, canonical: impl Into<String>, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(canonical, synonyms);
        self
    }

    /// Append all entries of `other`
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Term -> related terms in table order, both directions of every entry.
    fn lookup_map(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (canonical, synonyms) in &self.entries {
            for synonym in synonyms {
                push_unique(map.entry(canonical.clone()).or_default(), synonym);
                push_unique(map.entry(synonym.clone()).or_default(), canonical);
            }
        }
        map
    }
}

fn push_unique(list: &mut Vec<String>, term: &str) {
    if !list.iter().any(|existing| existing == term) {
        list.push(term.to_string());
    }
}

fn normalize_phrase(raw: &str) -> String {
    tokenize(raw).join(" ")
}

/// Result of expanding one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryExpansion {
    variants: Vec<String>,
    original_terms: Vec<String>,
    expansion_terms: Vec<String>,
}

impl QueryExpansion {
    /// The original query first, then one variant per synonym substitution.
    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Distinct terms of the query as written
    #[must_use]
    pub fn original_terms(&self) -> &[String] {
        &self.original_terms
    }

    /// Synonym terms that are not already in the query
    #[must_use]
    pub fn expansion_terms(&self) -> &[String] {
        &self.expansion_terms
    }

    /// Original terms followed by expansion terms
    #[must_use]
    pub fn terms(&self) -> Vec<String> {
        self.original_terms
            .iter()
            .chain(self.expansion_terms.iter())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        !self.expansion_terms.is_empty()
    }
}

/// One-level synonym expansion over a fixed [`SynonymTable`].
#[derive(Debug, Clone)]
pub struct QueryExpander {
    /// Term or phrase -> related terms
    synonyms: HashMap<String, Vec<String>>,
    /// Longest phrase (in tokens) that appears as a lookup key
    max_phrase_len: usize,
    max_expansions_per_term: usize,
}

impl QueryExpander {
    #[must_use]
    pub fn new(table: &SynonymTable) -> Self {
        let synonyms = table.lookup_map();
        let max_phrase_len = synonyms
            .keys()
            .map(|key| key.split(' ').count())
            .max()
            .unwrap_or(1);
        Self {
            synonyms,
            max_phrase_len,
            max_expansions_per_term: DEFAULT_MAX_EXPANSIONS_PER_TERM,
        }
    }

    /// Expander over the built-in table
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(&SynonymTable::builtin())
    }

    /// Builder: cap synonyms per matched term (0 disables expansion)
    #[must_use]
    pub const fn max_expansions_per_term(mut self, max: usize) -> Self {
        self.max_expansions_per_term = max;
        self
    }

    /// Related terms for one term or phrase, capped, in table order.
    #[must_use]
    pub fn synonyms_of(&self, term: &str) -> Vec<String> {
        self.synonyms
            .get(&normalize_phrase(term))
            .map(|syns| {
                syns.iter()
                    .take(self.max_expansions_per_term)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Expand query with synonyms of every term (and multi-word phrase) found in the table.
    #[must_use]
    pub fn expand(&self, query: &str) -> QueryExpansion {
        let tokens = tokenize(query);
        let original_terms = dedup_terms(tokens.iter().cloned());

        let mut variants = Vec::new();
        let trimmed = query.trim();
        if !trimmed.is_empty() {
            variants.push(trimmed.to_string());
        }
        let mut expansion_terms = Vec::new();

        for start in 0..tokens.len() {
            let longest = self.max_phrase_len.min(tokens.len() - start);
            for len in 1..=longest {
                let key = tokens[start..start + len].join(" ");
                let synonyms = self.synonyms_of(&key);
                for synonym in synonyms {
                    let mut variant = tokens[..start].to_vec();
                    variant.push(synonym.clone());
                    variant.extend_from_slice(&tokens[start + len..]);
                    push_unique(&mut variants, &variant.join(" "));

                    for term in tokenize(&synonym) {
                        if !original_terms.contains(&term) {
                            push_unique(&mut expansion_terms, &term);
                        }
                    }
                }
            }
        }

        log::debug!(
            "Expanded '{}' -> {} variants, {} extra terms",
            query,
            variants.len(),
            expansion_terms.len()
        );

        QueryExpansion {
            variants,
            original_terms,
            expansion_terms,
        }
    }

    /// Expand query and create a flat query string
    /// Format: "term1 term2 synonym1 synonym2..."
    #[must_use]
    pub fn expand_to_query(&self, query: &str) -> String {
        self.expand(query).terms().join(" ")
    }
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::builtin()
    }
}
