use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::Builder as TempFileBuilder;

use super::error::SplitError;
use super::tool_log::ToolCommandLogger;
use crate::ui::prelude::*;

/// Lossless audio operations delegated to an external executable.
pub trait MediaTool {
    /// Join `inputs` in order into `output`.
    fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), SplitError>;

    /// Copy `[start_secs, start_secs + duration_secs)` of `input` into `output`.
    fn extract(
        &self,
        input: &Path,
        start_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> Result<(), SplitError>;
}

/// Resolve an executable on `PATH` (or an explicit path).
pub fn locate(program: &str) -> Result<PathBuf, SplitError> {
    which::which(program).map_err(|_| SplitError::ToolMissing(program.to_string()))
}

#[derive(Debug, Clone)]
pub struct SystemFfmpeg {
    program: String,
    logger: Option<ToolCommandLogger>,
}

impl SystemFfmpeg {
    pub fn new(program: impl Into<String>, logger: Option<ToolCommandLogger>) -> Self {
        Self {
            program: program.into(),
            logger,
        }
    }

    fn run(&self, args: &[String]) -> Result<(), SplitError> {
        emit(
            Level::Debug,
            "split.ffmpeg.command",
            &format!("{} {}", self.program, args.join(" ")),
            None,
        );

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SplitError::ExternalTool {
                tool: self.program.clone(),
                status: None,
                stderr: format!("failed to spawn: {e}"),
            })?;

        let mut last_line = String::new();
        let mut error_lines: Vec<String> = Vec::new();
        let mut transcript = String::new();
        let read_result = match child.stderr.take() {
            Some(stderr) => read_stderr(
                stderr,
                is_debug_enabled(),
                &mut last_line,
                &mut error_lines,
                &mut transcript,
            ),
            None => Ok(()),
        };

        let status = child.wait()?;

        if let Some(logger) = &self.logger {
            if let Err(err) =
                logger.log_command(&self.program, args, status.code(), &transcript)
            {
                emit(
                    Level::Debug,
                    "split.tool_log.failed",
                    &format!("Could not record tool invocation: {err:#}"),
                    None,
                );
            }
        }

        read_result?;

        if !status.success() {
            let message = if !error_lines.is_empty() {
                error_lines.join("\n")
            } else {
                last_line
            };
            return Err(SplitError::ExternalTool {
                tool: self.program.clone(),
                status: status.code(),
                stderr: message.trim().to_string(),
            });
        }

        Ok(())
    }
}

impl MediaTool for SystemFfmpeg {
    fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), SplitError> {
        let manifest_dir = output.parent().unwrap_or(Path::new("."));
        let mut manifest = TempFileBuilder::new()
            .prefix(".concat-")
            .suffix(".txt")
            .tempfile_in(manifest_dir)?;
        manifest.write_all(concat_manifest(inputs)?.as_bytes())?;
        manifest.flush()?;

        let args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest.path().to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            "-y".to_string(),
            output.to_string_lossy().into_owned(),
        ];

        // The manifest is removed when it goes out of scope, success or not.
        self.run(&args)
    }

    fn extract(
        &self,
        input: &Path,
        start_secs: f64,
        duration_secs: f64,
        output: &Path,
    ) -> Result<(), SplitError> {
        let args = extract_args(input, start_secs, duration_secs, output);
        self.run(&args)
    }
}

/// Body of an ffmpeg concat-demuxer list. Paths are made absolute because the
/// demuxer resolves relative entries against the list's own directory.
pub fn concat_manifest(inputs: &[PathBuf]) -> Result<String, SplitError> {
    let mut body = String::new();
    for input in inputs {
        let absolute = std::path::absolute(input)?;
        let escaped = absolute.to_string_lossy().replace('\'', "'\\''");
        body.push_str(&format!("file '{}'\n", escaped));
    }
    Ok(body)
}

pub fn extract_args(input: &Path, start_secs: f64, duration_secs: f64, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-ss".to_string(),
        format!("{:.3}", start_secs),
        "-t".to_string(),
        format!("{:.3}", duration_secs),
        "-map".to_string(),
        "0:a".to_string(),
        "-c".to_string(),
        "copy".to_string(),
        "-f".to_string(),
        "mp3".to_string(),
        "-y".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

fn read_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    last_line: &mut String,
    error_lines: &mut Vec<String>,
    transcript: &mut String,
) -> Result<(), SplitError> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        let chunk = String::from_utf8_lossy(&buffer[..bytes_read]);
        transcript.push_str(&chunk);
        accumulated.push_str(&chunk);

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated = accumulated[pos + 1..].to_string();
            record_line(line, verbose, last_line, error_lines);
        }
    }

    if !accumulated.is_empty() {
        record_line(accumulated, verbose, last_line, error_lines);
    }

    Ok(())
}

fn record_line(line: String, verbose: bool, last_line: &mut String, error_lines: &mut Vec<String>) {
    if line.trim().is_empty() {
        return;
    }
    if verbose {
        eprintln!("{}", line);
    }
    if line.to_ascii_lowercase().contains("error") {
        error_lines.push(line.clone());
    }
    *last_line = line;
}
