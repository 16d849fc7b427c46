//! Catalog records.
//!
//! The service sends loosely shaped JSON. Each payload is decoded exactly once
//! into a `Raw*` struct where every field is optional, then converted into a
//! record whose defaults are fixed here rather than at each use site.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawBook {
    title: Option<String>,
    authors: Vec<RawNamed>,
    asin: Option<String>,
    release_date: Option<String>,
    publisher: Option<String>,
    genres: Vec<RawNamed>,
    length_minutes: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNamed {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawChapter {
    title: Option<String>,
    start_offset_sec: Option<f64>,
    start_offset_ms: Option<f64>,
    length_ms: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChapterList {
    chapters: Option<Vec<Value>>,
}

/// A search hit or a directly looked-up book.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateBook {
    /// Empty when the service omitted it.
    pub title: String,
    pub authors: Vec<String>,
    pub asin: Option<String>,
    pub release_date: Option<String>,
    pub publisher: Option<String>,
    pub genres: Vec<String>,
    pub length_minutes: Option<u64>,
}

impl CandidateBook {
    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    pub fn first_genre(&self) -> Option<&str> {
        self.genres.first().map(String::as_str)
    }

    /// Leading four characters of the release date, if any.
    pub fn year(&self) -> Option<String> {
        self.release_date
            .as_deref()
            .map(str::trim)
            .filter(|date| !date.is_empty())
            .map(|date| date.chars().take(4).collect())
    }
}

/// One chapter boundary as reported by the service. Untrusted: any field may
/// be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChapterSpec {
    pub title: Option<String>,
    /// Seconds from the start of the concatenated timeline.
    pub start_secs: Option<f64>,
    /// Declared length in seconds; `None` when absent.
    pub duration_secs: Option<f64>,
}

impl ChapterSpec {
    pub fn new(title: &str, start_secs: f64, duration_secs: f64) -> Self {
        Self {
            title: Some(title.to_string()),
            start_secs: Some(start_secs),
            duration_secs: Some(duration_secs),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn names(raw: Vec<RawNamed>) -> Vec<String> {
    raw.into_iter().filter_map(|n| clean(n.name)).collect()
}

impl From<RawBook> for CandidateBook {
    fn from(raw: RawBook) -> Self {
        Self {
            title: clean(raw.title).unwrap_or_default(),
            authors: names(raw.authors),
            asin: clean(raw.asin),
            release_date: clean(raw.release_date),
            publisher: clean(raw.publisher),
            genres: names(raw.genres),
            length_minutes: raw
                .length_minutes
                .filter(|m| m.is_finite() && *m >= 0.0)
                .map(|m| m.round() as u64),
        }
    }
}

impl From<RawChapter> for ChapterSpec {
    fn from(raw: RawChapter) -> Self {
        let start_secs = raw
            .start_offset_sec
            .or_else(|| raw.start_offset_ms.map(|ms| ms / 1000.0));
        Self {
            title: clean(raw.title),
            start_secs,
            duration_secs: raw.length_ms.map(|ms| ms / 1000.0),
        }
    }
}

/// Decode a search response. Entries that do not look like a book are
/// skipped; the count of skipped entries is returned alongside.
pub fn decode_candidates(body: &str) -> Result<(Vec<CandidateBook>, usize), String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => return Err(format!("expected a JSON array, got {}", kind_of(&other))),
    };

    let mut skipped = 0;
    let mut books = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawBook>(item) {
            Ok(raw) => books.push(raw.into()),
            Err(_) => skipped += 1,
        }
    }
    Ok((books, skipped))
}

pub fn decode_book(body: &str) -> Result<CandidateBook, String> {
    serde_json::from_str::<RawBook>(body)
        .map(Into::into)
        .map_err(|e| e.to_string())
}

/// Decode a `{ "chapters": [...] }` response.
pub fn decode_chapters(body: &str) -> Result<Vec<ChapterSpec>, String> {
    let list: RawChapterList = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let items = list
        .chapters
        .ok_or_else(|| "response has no 'chapters' field".to_string())?;

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value::<RawChapter>(item)
                .map(Into::into)
                .map_err(|e| format!("chapter {}: {}", idx + 1, e))
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
