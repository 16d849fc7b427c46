use chrono::{DateTime, Utc};
use serde_json::json;

use crate::ui::prelude::*;

/// Final result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every chapter was cut and cleanup finished.
    Success,
    /// Every planned chapter was cut, but cleanup did not finish or chapters
    /// were left out of the plan.
    Partial,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Partial => "partial",
            Outcome::Failed => "failed",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Outcome::Success => "All operations completed successfully!",
            Outcome::Partial => {
                "Splitting completed successfully, but some cleanup operations failed."
            }
            Outcome::Failed => "Splitting operation failed.",
        }
    }
}

/// Why a run that cut every planned chapter still ended `Partial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialReason {
    /// Chapters were left out of the plan, so the originals were kept.
    ChaptersExcluded,
    /// Removing an original file failed.
    CleanupFailed,
}

impl PartialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PartialReason::ChaptersExcluded => "chapters_excluded",
            PartialReason::CleanupFailed => "cleanup_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub outcome: Outcome,
    /// Drives the exit code: every planned chapter was cut (or nothing was
    /// meant to be cut in a dry run).
    pub cut_succeeded: bool,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub planned: usize,
    pub cut: usize,
    pub excluded: usize,
    pub tag_failures: usize,
    pub originals_removed: usize,
    pub partial_reason: Option<PartialReason>,
}

impl SessionReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            outcome: Outcome::Failed,
            cut_succeeded: false,
            dry_run: false,
            started_at,
            finished_at: started_at,
            planned: 0,
            cut: 0,
            excluded: 0,
            tag_failures: 0,
            originals_removed: 0,
            partial_reason: None,
        }
    }

    pub fn summary(&self) -> &'static str {
        match (self.outcome, self.partial_reason) {
            (Outcome::Partial, Some(PartialReason::ChaptersExcluded)) => {
                "Splitting completed, but some chapters were left out; original files were kept."
            }
            (outcome, _) => outcome.summary(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.cut_succeeded { 0 } else { 1 }
    }
}

/// `1h 02m 03s`, `4m 05s` or `12.3s`.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    let total_secs = millis / 1000;
    let (hours, minutes, seconds) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn print_report(report: &SessionReport) {
    let elapsed = report.finished_at - report.started_at;

    separator(false);
    let mut block = String::new();
    block.push_str(&format!(
        "{} Started at:  {}\n",
        char::from(NerdFont::Clock),
        timestamp(&report.started_at)
    ));
    block.push_str(&format!(
        "{} Finished at: {}\n",
        char::from(NerdFont::Clock),
        timestamp(&report.finished_at)
    ));
    block.push_str(&format!(
        "{} Total processing time: {}\n",
        char::from(NerdFont::Timer),
        format_elapsed(elapsed)
    ));
    if report.planned > 0 {
        block.push_str(&format!(
            "{} Chapters: {} cut of {} planned",
            char::from(NerdFont::File),
            report.cut,
            report.planned
        ));
        if report.excluded > 0 {
            block.push_str(&format!(", {} excluded", report.excluded));
        }
        if report.tag_failures > 0 {
            block.push_str(&format!(", {} untagged", report.tag_failures));
        }
        block.push('\n');
    }
    if report.originals_removed > 0 {
        block.push_str(&format!(
            "{} Removed {} original file(s)\n",
            char::from(NerdFont::Trash),
            report.originals_removed
        ));
    }
    print_block(block.trim_end());
    separator(false);

    let data = json!({
        "outcome": report.outcome.as_str(),
        "cut_succeeded": report.cut_succeeded,
        "dry_run": report.dry_run,
        "started_at": report.started_at.to_rfc3339(),
        "finished_at": report.finished_at.to_rfc3339(),
        "elapsed_ms": elapsed.num_milliseconds(),
        "planned": report.planned,
        "cut": report.cut,
        "excluded": report.excluded,
        "tag_failures": report.tag_failures,
        "originals_removed": report.originals_removed,
        "partial_reason": report.partial_reason.map(PartialReason::as_str),
    });

    if report.dry_run {
        emit(
            Level::Success,
            "split.report.dry_run",
            &format!(
                "{} Dry run finished; no files were written or removed.",
                char::from(NerdFont::Check)
            ),
            Some(data),
        );
        return;
    }

    let (level, icon) = match report.outcome {
        Outcome::Success => (Level::Success, NerdFont::Check),
        Outcome::Partial => (Level::Warn, NerdFont::Warning),
        Outcome::Failed => (Level::Error, NerdFont::Cross),
    };
    emit(
        level,
        "split.report.summary",
        &format!("{} {}", char::from(icon), report.summary()),
        Some(data),
    );
}
