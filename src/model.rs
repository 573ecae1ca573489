//! Record shapes handed to the host aggregator.
//!
//! Every record is built fresh per call and owned by the caller; nothing here is cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder cover used when a listing entry has no usable image source.
pub const NO_THUMBNAIL_URL: &str = "https://placehold.co/225x320?text=No+Thumbnail";

/// The only language this source publishes in.
pub const LANGUAGE: &str = "en";

/// Publication status as shown on listing cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ongoing,
    Completed,
    Cancelled,
    Hiatus,
    Unknown,
}

impl Status {
    /// Map a status label (any case, surrounding whitespace ignored) to a status.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "ongoing" => Status::Ongoing,
            "completed" => Status::Completed,
            "cancelled" => Status::Cancelled,
            "hiatus" => Status::Hiatus,
            _ => Status::Unknown,
        }
    }
}

/// One search-result card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    /// Absolute URL of the manga detail page.
    pub url: String,
    pub cover: String,
    pub complete: bool,
}

/// Metadata from a manga detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaRecord {
    pub name: String,
    /// Plain text, whitespace collapsed.
    pub description: String,
    pub original_language: String,
    pub genres: Vec<String>,
    pub complete: bool,
    pub url: String,
}

/// One chapter row. The source does not distinguish contributor roles, so all six
/// role lists carry the same authors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub name: String,
    pub chapter_number: f64,
    pub localization: String,
    pub release_date: DateTime<Utc>,
    pub url: String,
    pub source_url: String,
    pub writer: Vec<String>,
    pub penciller: Vec<String>,
    pub inker: Vec<String>,
    pub colorist: Vec<String>,
    pub letterer: Vec<String>,
    pub cover_artist: Vec<String>,
    pub arguments: Arguments,
}

/// One page image. Position in the returned sequence is the reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
}

/// Opaque request context from the host. Only `url` (and optionally `complete`) is read;
/// the whole bag is passed through into chapter records untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pointing at `url`, the common case for the CLI and tests.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self::new().with("url", url.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `url` entry, if present and a string.
    pub fn url(&self) -> Option<&str> {
        self.0.get("url").and_then(Value::as_str)
    }

    /// The caller-supplied completeness flag; absent or non-boolean reads as `false`.
    pub fn complete(&self) -> bool {
        self.0
            .get("complete")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
