use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder as TempFileBuilder, TempPath};

use super::discovery::InputFile;
use super::error::SplitError;
use super::ffmpeg::MediaTool;
use super::planner::{ChapterPlanEntry, Plan};
use super::tagger::Tagger;
use crate::common::progress::{create_bar, create_spinner};
use crate::ui::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Success,
    /// Extraction failed; no output file exists for the entry.
    CutFailed(String),
    /// Output exists but carries no tags.
    TagFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome {
    pub index: usize,
    pub output: PathBuf,
    pub status: EntryStatus,
}

impl EntryOutcome {
    pub fn is_cut(&self) -> bool {
        !matches!(self.status, EntryStatus::CutFailed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub outcomes: Vec<EntryOutcome>,
}

impl ExecutionResult {
    /// Every planned entry produced its output file.
    pub fn all_cut(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(EntryOutcome::is_cut)
    }

    pub fn cut_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_cut()).count()
    }

    pub fn tag_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, EntryStatus::TagFailed(_)))
            .count()
    }

    /// Re-check on disk that every reported output exists and is non-empty.
    pub fn outputs_present(&self) -> bool {
        self.outcomes
            .iter()
            .filter(|o| o.is_cut())
            .all(|o| fs::metadata(&o.output).is_ok_and(|m| m.is_file() && m.len() > 0))
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter(|o| o.is_cut())
            .map(|o| o.output.as_path())
    }
}

/// Realizes a [`Plan`] in the input folder.
pub struct MediaCutter<'a> {
    tool: &'a dyn MediaTool,
    tagger: &'a dyn Tagger,
}

impl<'a> MediaCutter<'a> {
    pub fn new(tool: &'a dyn MediaTool, tagger: &'a dyn Tagger) -> Self {
        Self { tool, tagger }
    }

    /// Cut every plan entry out of the timeline formed by `inputs`.
    ///
    /// Only a failure to build the shared timeline is returned as an error;
    /// per-entry failures are recorded in the result and the sweep continues.
    pub fn execute(
        &self,
        folder: &Path,
        inputs: &[InputFile],
        plan: &Plan,
    ) -> Result<ExecutionResult, SplitError> {
        let Some(first) = inputs.first() else {
            return Err(SplitError::NoInputFiles(folder.to_path_buf()));
        };

        // Kept alive until every entry is cut, removed on drop.
        let combined = if needs_timeline_copy(folder, inputs, plan) {
            Some(self.build_timeline(folder, inputs)?)
        } else {
            None
        };
        let source: &Path = combined.as_deref().unwrap_or(first.path.as_path());

        let pb = create_bar(plan.entries.len() as u64, "Cutting chapters".to_string());
        let mut result = ExecutionResult::default();

        for entry in &plan.entries {
            pb.set_message(entry.file_name.clone());
            let outcome = self.cut_entry(folder, source, entry);

            pb.suspend(|| report_outcome(entry, &outcome));
            result.outcomes.push(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        if let Some(combined) = combined {
            let path = combined.to_path_buf();
            match combined.close() {
                Ok(()) => emit(
                    Level::Debug,
                    "split.cut.cleanup",
                    &format!("Removed intermediate file {}", path.display()),
                    None,
                ),
                Err(err) => emit(
                    Level::Warn,
                    "split.cut.cleanup_failed",
                    &format!(
                        "{} Could not remove intermediate file {}: {}",
                        char::from(NerdFont::Warning),
                        path.display(),
                        err
                    ),
                    None,
                ),
            }
        }

        Ok(result)
    }

    /// Join all inputs into a hidden file in `folder`. The path is only
    /// handed out once the tool reported success and the file has content.
    fn build_timeline(&self, folder: &Path, inputs: &[InputFile]) -> Result<TempPath, SplitError> {
        let combined = TempFileBuilder::new()
            .prefix(".combined-")
            .suffix(".mp3")
            .tempfile_in(folder)?
            .into_temp_path();

        let paths: Vec<PathBuf> = inputs.iter().map(|f| f.path.clone()).collect();
        let spinner = create_spinner(format!("Joining {} files...", paths.len()));
        let joined = self.tool.concat(&paths, &combined);
        spinner.finish_and_clear();
        joined?;

        if !has_content(&combined) {
            return Err(SplitError::ExternalTool {
                tool: "concat".to_string(),
                status: None,
                stderr: "joined timeline is empty".to_string(),
            });
        }

        emit(
            Level::Info,
            "split.cut.joined",
            &format!(
                "{} Joined {} files into one timeline",
                char::from(NerdFont::Sync),
                paths.len()
            ),
            None,
        );
        Ok(combined)
    }

    fn cut_entry(&self, folder: &Path, source: &Path, entry: &ChapterPlanEntry) -> EntryOutcome {
        let output = folder.join(&entry.file_name);
        let status = match self.cut_to_temp(folder, source, entry) {
            Err(err) => EntryStatus::CutFailed(err.to_string()),
            Ok(partial) => {
                let tag_error = self
                    .tagger
                    .write_tags(&partial, &entry.tags)
                    .err()
                    .map(|err| err.to_string());
                match partial.persist(&output) {
                    Err(err) => EntryStatus::CutFailed(format!(
                        "cannot move output into place: {}",
                        err.error
                    )),
                    Ok(()) => match tag_error {
                        Some(message) => EntryStatus::TagFailed(message),
                        None => EntryStatus::Success,
                    },
                }
            }
        };

        EntryOutcome {
            index: entry.index,
            output,
            status,
        }
    }

    /// Extract into a hidden sibling of the final output so an interrupted
    /// cut never leaves a truncated chapter under its real name.
    fn cut_to_temp(
        &self,
        folder: &Path,
        source: &Path,
        entry: &ChapterPlanEntry,
    ) -> Result<TempPath, SplitError> {
        let partial = TempFileBuilder::new()
            .prefix(&format!(".{:02}-", entry.index))
            .suffix(".mp3")
            .tempfile_in(folder)?
            .into_temp_path();

        self.tool
            .extract(source, entry.start_secs, entry.duration_secs, &partial)?;

        if !has_content(&partial) {
            return Err(SplitError::ExternalTool {
                tool: "extract".to_string(),
                status: None,
                stderr: "produced an empty file".to_string(),
            });
        }
        Ok(partial)
    }
}

/// The shared timeline must be a separate file when there are several inputs,
/// or when an output would replace the single input mid-sweep.
fn needs_timeline_copy(folder: &Path, inputs: &[InputFile], plan: &Plan) -> bool {
    if inputs.len() > 1 {
        return true;
    }
    plan.entries.iter().any(|entry| {
        let output = folder.join(&entry.file_name);
        inputs.iter().any(|input| same_file(&input.path, &output))
    })
}

pub fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn has_content(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.len() > 0)
}

fn report_outcome(entry: &ChapterPlanEntry, outcome: &EntryOutcome) {
    match &outcome.status {
        EntryStatus::Success => emit(
            Level::Success,
            "split.cut.entry",
            &format!("{} Created {}", char::from(NerdFont::Check), entry.file_name),
            Some(serde_json::json!({
                "index": entry.index,
                "file": entry.file_name,
                "start": entry.start_secs,
                "duration": entry.duration_secs,
            })),
        ),
        EntryStatus::TagFailed(message) => emit(
            Level::Warn,
            "split.tag.failed",
            &format!(
                "{} Created {} without tags: {}",
                char::from(NerdFont::Warning),
                entry.file_name,
                message
            ),
            Some(serde_json::json!({ "index": entry.index, "file": entry.file_name })),
        ),
        EntryStatus::CutFailed(message) => emit(
            Level::Error,
            "split.cut.failed",
            &format!(
                "{} Chapter {} ({}) failed: {}",
                char::from(NerdFont::Cross),
                entry.index,
                entry.file_name,
                message
            ),
            Some(serde_json::json!({ "index": entry.index, "file": entry.file_name })),
        ),
    }
}
