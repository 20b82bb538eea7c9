use crate::error::{Result, SearchError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A searchable document: extracted plain text plus file metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique within a corpus
    pub id: String,

    /// Extracted plain-text content
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub metadata: DocumentMetadata,

    /// Precomputed semantic score in [0, 1] from an upstream embedding step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    /// Document embedding, stored in the vector store on index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// File metadata attached to a [`Document`].
///
/// Timestamps are kept as the raw strings the caller supplied so that a
/// malformed value only disables the recency signal instead of failing
/// deserialization of the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,

    /// Extension (`"xlsx"`, `".pdf"`), MIME type or category name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Builder: set filename
    #[must_use]
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.metadata.filename = filename.into();
        self
    }

    /// Builder: set modification time
    #[must_use]
    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.modified_at = Some(at.to_rfc3339());
        self
    }

    /// Builder: set modification time from an unparsed string
    #[must_use]
    pub fn modified_at_raw(mut self, raw: impl Into<String>) -> Self {
        self.metadata.modified_at = Some(raw.into());
        self
    }

    /// Builder: set creation time
    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.created_at = Some(at.to_rfc3339());
        self
    }

    /// Builder: set file type hint
    #[must_use]
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.metadata.file_type = Some(file_type.into());
        self
    }

    /// Builder: set precomputed semantic similarity
    #[must_use]
    pub const fn similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Builder: set embedding
    #[must_use]
    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Builder: add an extra metadata field
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    /// Parsed `modified_at`; `None` when missing or malformed.
    #[must_use]
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.metadata.modified_at.as_deref().and_then(parse_timestamp)
    }

    #[must_use]
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.metadata.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Type category from the `file_type` hint, falling back to the filename extension.
    #[must_use]
    pub fn file_category(&self) -> Option<FileCategory> {
        self.metadata
            .file_type
            .as_deref()
            .and_then(FileCategory::from_type_hint)
            .or_else(|| {
                let (_, ext) = self.metadata.filename.rsplit_once('.')?;
                FileCategory::from_extension(ext)
            })
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` (read as UTC) and plain dates.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coarse document type used by the file-type signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Document,
    Spreadsheet,
    Presentation,
    Image,
    Text,
}

impl FileCategory {
    pub const ALL: [Self; 5] = [
        Self::Document,
        Self::Spreadsheet,
        Self::Presentation,
        Self::Image,
        Self::Text,
    ];

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        let category = match ext.as_str() {
            "pdf" | "doc" | "docx" | "rtf" | "odt" => Self::Document,
            "xls" | "xlsx" | "csv" | "ods" => Self::Spreadsheet,
            "ppt" | "pptx" | "key" | "odp" => Self::Presentation,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "heic" => Self::Image,
            "txt" | "md" => Self::Text,
            _ => return None,
        };
        Some(category)
    }

    /// Interpret a `file_type` hint: an extension, a MIME type or a category name.
    #[must_use]
    pub fn from_type_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_ascii_lowercase();
        if let Some(category) = Self::from_extension(&hint) {
            return Some(category);
        }
        if let Some(category) = Self::ALL.into_iter().find(|c| c.name() == hint) {
            return Some(category);
        }
        let (kind, subtype) = hint.split_once('/')?;
        if kind == "image" {
            return Some(Self::Image);
        }
        if subtype.contains("spreadsheet") || subtype.contains("excel") || subtype == "csv" {
            return Some(Self::Spreadsheet);
        }
        if subtype.contains("presentation") || subtype.contains("powerpoint") {
            return Some(Self::Presentation);
        }
        if subtype.contains("pdf") || subtype.contains("word") || subtype.contains("rtf") {
            return Some(Self::Document);
        }
        if kind == "text" {
            return Some(Self::Text);
        }
        None
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Image => "image",
            Self::Text => "text",
        }
    }

    /// Query words that ask for this category.
    #[must_use]
    pub const fn query_terms(self) -> &'static [&'static str] {
        match self {
            Self::Document => &["document", "doc", "docx", "pdf", "rtf", "odt"],
            Self::Spreadsheet => &["spreadsheet", "excel", "sheet", "xls", "xlsx", "csv", "ods"],
            Self::Presentation => &["presentation", "slides", "deck", "ppt", "pptx", "keynote"],
            Self::Image => &["image", "photo", "picture", "pic", "png", "jpg", "jpeg", "gif"],
            Self::Text => &["text", "txt", "md", "markdown", "notes"],
        }
    }
}

/// An ordered, id-unique collection of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(documents.len());
        for (pos, doc) in documents.iter().enumerate() {
            if positions.insert(doc.id.clone(), pos).is_some() {
                return Err(SearchError::DuplicateDocument(doc.id.clone()));
            }
        }
        Ok(Self {
            documents,
            positions,
        })
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.position(id).map(|pos| &self.documents[pos])
    }

    /// Position of `id` in corpus order
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
