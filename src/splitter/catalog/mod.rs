//! AudiMeta catalog access.

mod client;
mod models;

pub use client::{AudiMetaClient, CatalogApi, SearchQuery};
pub use models::{CandidateBook, ChapterSpec};
