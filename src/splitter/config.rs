use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;

/// How chapter output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStyle {
    /// `01_Title.mp3`
    #[default]
    Underscore,
    /// `01 - Title.mp3`
    Dashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub api_base_url: String,
    pub region: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub request_retries: u32,
    pub retry_backoff_ms: u64,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub filename_style: FilenameStyle,
    pub duration_tolerance_secs: f64,
    pub delete_originals: bool,
    pub fallback_artist: String,
    pub fallback_album: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            region: "us".to_string(),
            user_agent: format!("AudioMetaSplitter/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            request_retries: 2,
            retry_backoff_ms: 500,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            filename_style: FilenameStyle::default(),
            duration_tolerance_secs: Self::DEFAULT_TOLERANCE_SECS,
            delete_originals: true,
            fallback_artist: "Unknown Author".to_string(),
            fallback_album: "Unknown Title".to_string(),
        }
    }
}

documented_config!(SplitterConfig {
    fields: [
        api_base_url, "Base URL of the AudiMeta catalog",
        region, "Region passed to catalog searches",
        user_agent, "User-Agent header sent to the catalog",
        request_timeout_secs, "Timeout for a single catalog request (seconds)",
        request_retries, "Extra attempts for failed catalog requests",
        retry_backoff_ms, "Initial retry delay, doubled on every attempt (milliseconds)",
        ffmpeg_bin, "ffmpeg executable used to join and cut audio",
        ffprobe_bin, "ffprobe executable used to measure durations",
        filename_style, "Output names: underscore (01_Title.mp3) or dashed (01 - Title.mp3)",
        duration_tolerance_secs, "How far a chapter may end past the measured runtime (seconds)",
        delete_originals, "Remove the source files after every chapter was cut",
        fallback_artist, "Artist tag when the book lists no author",
        fallback_album, "Album tag when the book has no title",
    ],
    config_path: paths::app_config_dir().map(|dir| dir.join("config.toml")),
});

impl SplitterConfig {
    pub const DEFAULT_API_BASE_URL: &'static str = "https://audimeta.de";
    pub const DEFAULT_TOLERANCE_SECS: f64 = 2.0;

    /// Load from an explicit path, or from the default location.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => <Self as DocumentedConfig>::load_from_path_documented(path)?,
            None => <Self as DocumentedConfig>::load()?,
        };
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = if trimmed.is_empty() {
            Self::DEFAULT_API_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        };
        if !self.duration_tolerance_secs.is_finite() || self.duration_tolerance_secs < 0.0 {
            self.duration_tolerance_secs = Self::DEFAULT_TOLERANCE_SECS;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_is_created_with_documentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = SplitterConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.api_base_url, "https://audimeta.de");

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("api_base_url = \"https://audimeta.de\"  # Base URL"));
        assert!(written.contains("filename_style = \"underscore\""));

        // The documented file must parse back to the same values
        let reloaded = SplitterConfig::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.request_retries, config.request_retries);
        assert_eq!(reloaded.filename_style, FilenameStyle::Underscore);
    }

    #[test]
    fn partial_file_keeps_defaults_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"http://127.0.0.1:8080/\"\nfilename_style = \"dashed\"\nduration_tolerance_secs = -4.0\n",
        )
        .unwrap();

        let config = SplitterConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080");
        assert_eq!(config.filename_style, FilenameStyle::Dashed);
        assert_eq!(config.duration_tolerance_secs, SplitterConfig::DEFAULT_TOLERANCE_SECS);
        assert_eq!(config.ffmpeg_bin, "ffmpeg");
    }

    #[test]
    fn short_commented_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let contents = "# local catalog mirror\nregion = \"de\"\n";
        fs::write(&path, contents).unwrap();

        let config = SplitterConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.region, "de");
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn rejects_unknown_filename_style() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "filename_style = \"camel\"\n").unwrap();
        assert!(SplitterConfig::load_from(Some(&path)).is_err());
    }
}
