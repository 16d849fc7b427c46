use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for audimeta-splitter
const APP_DIR: &str = "audimeta-splitter";

/// Get the splitter config directory
pub fn app_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join(APP_DIR);

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the splitter data directory
pub fn app_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
            home.join(".local/share")
        })
        .join(APP_DIR);

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory at {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Get the directory holding external tool invocation logs
pub fn tool_logs_dir() -> Result<PathBuf> {
    let logs_dir = app_data_dir()?.join("tool_logs");
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("creating tool logs directory at {}", logs_dir.display()))?;
    Ok(logs_dir)
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_user_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_user_path_leaves_plain_paths_alone() {
        assert_eq!(expand_user_path("/srv/books"), PathBuf::from("/srv/books"));
    }

    #[test]
    fn expand_user_path_expands_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user_path("~/books"), home.join("books"));
        }
    }
}
