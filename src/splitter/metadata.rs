use std::path::Path;

use id3::TagLike;

use super::error::SplitError;
use crate::ui::prelude::*;

/// TXXX description under which tagging tools store the Audible identifier.
const ASIN_FRAME: &str = "ASIN";

/// Seed for the catalog lookup, read from the first input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSeed {
    pub title: String,
    pub author: String,
    pub region: String,
    pub asin: Option<String>,
}

impl SearchSeed {
    /// Seed used when the file carries no usable tags. An empty title sends
    /// the session straight to manual search.
    pub fn fallback(region: &str) -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            region: region.to_string(),
            asin: None,
        }
    }

    pub fn is_searchable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Read the search seed from `path`, falling back to an empty seed instead of
/// failing the session.
pub fn extract_seed(path: &Path, region: &str) -> SearchSeed {
    match read_seed(path, region) {
        Ok(Some(seed)) => {
            emit(
                Level::Debug,
                "split.metadata.extracted",
                &format!(
                    "Tags of {}: title='{}' author='{}' asin={:?}",
                    path.display(),
                    seed.title,
                    seed.author,
                    seed.asin
                ),
                None,
            );
            seed
        }
        Ok(None) => {
            emit(
                Level::Info,
                "split.metadata.untagged",
                &format!(
                    "{} {} has no tags; falling back to manual search",
                    char::from(NerdFont::Info),
                    path.display()
                ),
                None,
            );
            SearchSeed::fallback(region)
        }
        Err(err) => {
            emit(
                Level::Warn,
                err.code(),
                &format!("{} {}", char::from(NerdFont::Warning), err),
                None,
            );
            SearchSeed::fallback(region)
        }
    }
}

fn read_seed(path: &Path, region: &str) -> Result<Option<SearchSeed>, SplitError> {
    let tag = match id3::Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => return Ok(None),
        Err(e) => {
            return Err(SplitError::MetadataExtraction {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    let title = non_empty(tag.title())
        .or_else(|| non_empty(tag.album()))
        .unwrap_or_default();
    let author = non_empty(tag.artist())
        .or_else(|| non_empty(tag.album_artist()))
        .unwrap_or_default();
    let asin = tag
        .extended_texts()
        .find(|text| text.description.eq_ignore_ascii_case(ASIN_FRAME))
        .and_then(|text| non_empty(Some(text.value.as_str())));

    if title.is_empty() && author.is_empty() && asin.is_none() {
        return Ok(None);
    }

    Ok(Some(SearchSeed {
        title,
        author,
        region: region.to_string(),
        asin,
    }))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().trim_matches('\0').trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
