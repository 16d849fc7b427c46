use std::thread::sleep;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use super::models::{self, CandidateBook, ChapterSpec};
use crate::splitter::config::SplitterConfig;
use crate::splitter::error::SplitError;
use crate::ui::prelude::*;

/// Parameters of a catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub author: String,
    pub region: String,
}

impl SearchQuery {
    pub fn describe(&self) -> String {
        if self.author.is_empty() {
            self.title.clone()
        } else {
            format!("{} by {}", self.title, self.author)
        }
    }
}

/// Request/response access to the book catalog.
pub trait CatalogApi {
    fn search(&self, query: &SearchQuery) -> Result<Vec<CandidateBook>, SplitError>;
    fn book(&self, asin: &str) -> Result<CandidateBook, SplitError>;
    fn chapters(&self, asin: &str) -> Result<Vec<ChapterSpec>, SplitError>;
}

#[derive(Debug, Clone)]
pub struct AudiMetaClient {
    http: Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

impl AudiMetaClient {
    pub fn new(config: &SplitterConfig) -> Result<Self, SplitError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SplitError::CatalogRequest {
                url: config.api_base_url.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            retries: config.request_retries,
            backoff: config.retry_backoff(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET `url` and return the body, retrying transport errors and 5xx
    /// responses with exponential backoff.
    fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SplitError> {
        let mut delay = self.backoff;
        let mut attempt = 0;

        loop {
            let result = self.fetch_once(url, query);
            let retryable = match &result {
                Ok(_) => false,
                Err(SplitError::CatalogRequest { .. }) => true,
                Err(SplitError::CatalogStatus { status, .. }) => *status >= 500,
                Err(_) => false,
            };

            if !retryable || attempt >= self.retries {
                return result;
            }

            attempt += 1;
            if let Err(err) = &result {
                emit(
                    Level::Debug,
                    "split.catalog.retry",
                    &format!(
                        "{} (attempt {}/{}, retrying in {} ms)",
                        err,
                        attempt,
                        self.retries,
                        delay.as_millis()
                    ),
                    None,
                );
            }
            sleep(delay);
            delay = delay.saturating_mul(2);
        }
    }

    fn fetch_once(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SplitError> {
        emit(
            Level::Debug,
            "split.catalog.request",
            &format!("GET {} {:?}", url, query),
            None,
        );

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|e| SplitError::CatalogRequest {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| SplitError::CatalogRequest {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(SplitError::CatalogStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        Ok(body)
    }
}

impl CatalogApi for AudiMetaClient {
    fn search(&self, query: &SearchQuery) -> Result<Vec<CandidateBook>, SplitError> {
        let url = self.url("search");
        let params = [
            ("title", query.title.as_str()),
            ("author", query.author.as_str()),
            ("region", query.region.as_str()),
            ("localTitle", query.title.as_str()),
            ("localAuthor", query.author.as_str()),
        ];
        let body = self.get_text(&url, &params)?;

        let (books, skipped) =
            models::decode_candidates(&body).map_err(|message| SplitError::CatalogDecode {
                url: url.clone(),
                message,
            })?;
        if skipped > 0 {
            emit(
                Level::Debug,
                "split.catalog.skipped",
                &format!("Ignored {} malformed search result(s)", skipped),
                None,
            );
        }
        Ok(books)
    }

    fn book(&self, asin: &str) -> Result<CandidateBook, SplitError> {
        let url = self.url(&format!("book/{}", urlencoding::encode(asin)));
        let body = self.get_text(&url, &[])?;
        let mut book = models::decode_book(&body)
            .map_err(|message| SplitError::CatalogDecode { url, message })?;
        if book.asin.is_none() {
            book.asin = Some(asin.to_string());
        }
        Ok(book)
    }

    fn chapters(&self, asin: &str) -> Result<Vec<ChapterSpec>, SplitError> {
        let url = self.url(&format!("chapters/{}", urlencoding::encode(asin)));
        let body = self
            .get_text(&url, &[])
            .map_err(|err| SplitError::ChapterFetch {
                asin: asin.to_string(),
                message: err.to_string(),
            })?;

        models::decode_chapters(&body).map_err(|message| SplitError::ChapterFetch {
            asin: asin.to_string(),
            message,
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(max_chars).collect();
    short.push_str("...");
    short
}
