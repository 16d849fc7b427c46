use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use crate::common::paths;

const LOG_FILE_NAME: &str = "commands.jsonl";

/// One external tool invocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCommandLog {
    pub timestamp: DateTime<Utc>,
    pub program: String,
    pub args: Vec<String>,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Appends tool invocations as JSON lines. Inactive unless verbose output is
/// enabled.
#[derive(Debug, Clone)]
pub struct ToolCommandLogger {
    log_dir: PathBuf,
}

impl ToolCommandLogger {
    pub fn new() -> Result<Self> {
        Ok(Self::with_dir(paths::tool_logs_dir()?))
    }

    pub fn with_dir(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    pub fn log_command(
        &self,
        program: &str,
        args: &[String],
        exit_code: Option<i32>,
        stderr: &str,
    ) -> Result<()> {
        if !crate::ui::is_debug_enabled() {
            return Ok(());
        }

        create_dir_all(&self.log_dir).context("Failed to create tool log directory")?;

        let entry = ToolCommandLog {
            timestamp: Utc::now(),
            program: program.to_string(),
            args: args.to_vec(),
            stderr: stderr.to_string(),
            exit_code,
            success: exit_code == Some(0),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file_path())
            .context("Failed to open tool log file")?;

        let json_line =
            serde_json::to_string(&entry).context("Failed to serialize tool command log")?;
        writeln!(file, "{json_line}").context("Failed to write to tool log file")?;

        Ok(())
    }
}
