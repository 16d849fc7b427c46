use std::path::{Path, PathBuf};
use std::process::Command;

use super::discovery::InputFile;
use super::error::SplitError;
use super::tool_log::ToolCommandLogger;
use crate::ui::prelude::*;

/// Playable duration of a single audio file.
pub trait DurationProbe {
    fn duration_secs(&self, path: &Path) -> Result<f64, SplitError>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
    logger: Option<ToolCommandLogger>,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>, logger: Option<ToolCommandLogger>) -> Self {
        Self {
            program: program.into(),
            logger,
        }
    }
}

impl DurationProbe for FfprobeProbe {
    fn duration_secs(&self, path: &Path) -> Result<f64, SplitError> {
        let args: Vec<String> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(path.to_string_lossy().into_owned()))
        .collect();

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| SplitError::DurationProbe {
                path: path.to_path_buf(),
                message: format!("failed to run {}: {e}", self.program),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(logger) = &self.logger {
            if let Err(err) = logger.log_command(&self.program, &args, output.status.code(), &stderr)
            {
                emit(
                    Level::Debug,
                    "split.tool_log.failed",
                    &format!("Could not record tool invocation: {err:#}"),
                    None,
                );
            }
        }

        if !output.status.success() {
            return Err(SplitError::DurationProbe {
                path: path.to_path_buf(),
                message: format!(
                    "{} exited with status {:?}: {}",
                    self.program,
                    output.status.code(),
                    stderr.trim()
                ),
            });
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            SplitError::DurationProbe {
                path: path.to_path_buf(),
                message: format!(
                    "unexpected duration output '{}'",
                    String::from_utf8_lossy(&output.stdout).trim()
                ),
            }
        })
    }
}

/// Parse ffprobe's bare duration line. Rejects `N/A`, negatives and
/// non-finite values.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    let value: f64 = stdout.lines().next()?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Probe every file in concatenation order. Any failure is fatal: without
/// every duration the total runtime, and with it the plan, is unknown.
pub fn probe_inputs(
    probe: &dyn DurationProbe,
    paths: &[PathBuf],
) -> Result<Vec<InputFile>, SplitError> {
    paths
        .iter()
        .enumerate()
        .map(|(ordinal, path)| {
            let duration_secs = probe.duration_secs(path)?;
            emit(
                Level::Debug,
                "split.probe.duration",
                &format!("{}: {:.3}s", path.display(), duration_secs),
                None,
            );
            Ok(InputFile {
                path: path.clone(),
                ordinal,
                duration_secs,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedProbe(HashMap<PathBuf, f64>);

    impl DurationProbe for FixedProbe {
        fn duration_secs(&self, path: &Path) -> Result<f64, SplitError> {
            self.0
                .get(path)
                .copied()
                .ok_or_else(|| SplitError::DurationProbe {
                    path: path.to_path_buf(),
                    message: "not audio".into(),
                })
        }
    }

    #[test]
    fn parses_ffprobe_output() {
        assert_eq!(parse_duration("600.024000\n"), Some(600.024));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration("-1.0"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn probes_in_order_with_ordinals() {
        let paths = vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")];
        let probe = FixedProbe(HashMap::from([
            (PathBuf::from("a.mp3"), 600.0),
            (PathBuf::from("b.mp3"), 612.5),
        ]));

        let files = probe_inputs(&probe, &paths).unwrap();
        assert_eq!(files[0].ordinal, 0);
        assert_eq!(files[1].ordinal, 1);
        assert_eq!(files[1].duration_secs, 612.5);
    }

    #[test]
    fn one_failed_probe_fails_all() {
        let paths = vec![PathBuf::from("a.mp3"), PathBuf::from("cover.mp3")];
        let probe = FixedProbe(HashMap::from([(PathBuf::from("a.mp3"), 600.0)]));

        let err = probe_inputs(&probe, &paths).unwrap_err();
        assert!(matches!(err, SplitError::DurationProbe { .. }));
        assert!(!err.is_recoverable());
    }
}
