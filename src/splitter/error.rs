use std::path::PathBuf;

use thiserror::Error;

/// Whether a failure ends the session or hands control back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("no MP3 files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("cannot read input folder {}: {source}", .path.display())]
    InputDiscovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read tags from {}: {message}", .path.display())]
    MetadataExtraction { path: PathBuf, message: String },

    #[error("catalog request to {url} failed: {message}")]
    CatalogRequest { url: String, message: String },

    #[error("catalog returned HTTP {status} for {url}: {body}")]
    CatalogStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected catalog response from {url}: {message}")]
    CatalogDecode { url: String, message: String },

    #[error("no catalog match for '{query}'")]
    NoMatch { query: String },

    #[error("cannot fetch chapters for {asin}: {message}")]
    ChapterFetch { asin: String, message: String },

    #[error("the catalog returned no chapters")]
    EmptyChapterList,

    #[error("no chapter survived validation; nothing to cut")]
    EmptyPlan,

    #[error("cannot determine duration of {}: {message}", .path.display())]
    DurationProbe { path: PathBuf, message: String },

    #[error("{0} not found; install ffmpeg or set its path in the config")]
    ToolMissing(String),

    #[error("{tool} exited with status {status:?}: {stderr}")]
    ExternalTool {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("cannot tag {}: {message}", .path.display())]
    Tagging { path: PathBuf, message: String },

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitError {
    pub fn severity(&self) -> Severity {
        match self {
            SplitError::MetadataExtraction { .. }
            | SplitError::CatalogRequest { .. }
            | SplitError::CatalogStatus { .. }
            | SplitError::CatalogDecode { .. }
            | SplitError::NoMatch { .. }
            | SplitError::Tagging { .. } => Severity::Recoverable,
            SplitError::NoInputFiles(_)
            | SplitError::InputDiscovery { .. }
            | SplitError::ChapterFetch { .. }
            | SplitError::EmptyChapterList
            | SplitError::EmptyPlan
            | SplitError::DurationProbe { .. }
            | SplitError::ToolMissing(_)
            | SplitError::Prompt(_)
            | SplitError::Io(_) => Severity::Fatal,
            // Fatal while building the shared timeline; the cutter records
            // per-chapter failures as outcomes instead of raising this.
            SplitError::ExternalTool { .. } => Severity::Fatal,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Recoverable
    }

    /// Stable event code for `ui::emit`.
    pub fn code(&self) -> &'static str {
        match self {
            SplitError::NoInputFiles(_) => "split.discovery.empty",
            SplitError::InputDiscovery { .. } => "split.discovery.failed",
            SplitError::MetadataExtraction { .. } => "split.metadata.failed",
            SplitError::CatalogRequest { .. }
            | SplitError::CatalogStatus { .. }
            | SplitError::CatalogDecode { .. } => "split.catalog.failed",
            SplitError::NoMatch { .. } => "split.catalog.no_match",
            SplitError::ChapterFetch { .. } => "split.chapters.failed",
            SplitError::EmptyChapterList => "split.chapters.empty",
            SplitError::EmptyPlan => "split.plan.empty",
            SplitError::DurationProbe { .. } => "split.probe.failed",
            SplitError::ToolMissing(_) => "split.tool.missing",
            SplitError::ExternalTool { .. } => "split.tool.failed",
            SplitError::Tagging { .. } => "split.tag.failed",
            SplitError::Prompt(_) => "split.prompt.failed",
            SplitError::Io(_) => "split.io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_failures_are_recoverable() {
        let err = SplitError::CatalogStatus {
            url: "https://audimeta.de/search".into(),
            status: 503,
            body: "busy".into(),
        };
        assert!(err.is_recoverable());
        assert!(SplitError::NoMatch { query: "x".into() }.is_recoverable());
    }

    #[test]
    fn missing_plan_inputs_are_fatal() {
        assert_eq!(SplitError::EmptyChapterList.severity(), Severity::Fatal);
        assert_eq!(SplitError::EmptyPlan.severity(), Severity::Fatal);
        let err = SplitError::ChapterFetch {
            asin: "B0TEST".into(),
            message: "HTTP 500".into(),
        };
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[test]
    fn messages_name_the_folder() {
        let err = SplitError::NoInputFiles(PathBuf::from("/books/empty"));
        assert_eq!(err.to_string(), "no MP3 files found in /books/empty");
    }
}
