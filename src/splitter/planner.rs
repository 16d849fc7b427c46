//! Chapter planning.
//!
//! Turns the catalog's chapter list and the measured runtime into an ordered
//! list of cuts. Entries keep their position in the catalog list as sequence
//! index even when neighbours are excluded, so file names and track numbers
//! always match the book's own chapter numbering.
//!
//! Planning is pure: no files are touched and nothing is printed.

use std::fmt;

use super::catalog::{CandidateBook, ChapterSpec};
use super::config::FilenameStyle;
use super::error::SplitError;

pub const MAX_TITLE_CHARS: usize = 200;
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Book-level fields copied into every chapter's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTags {
    pub album: String,
    pub artist: String,
    pub year: Option<String>,
    pub genre: Option<String>,
}

impl BookTags {
    pub fn from_book(book: &CandidateBook, fallback_artist: &str, fallback_album: &str) -> Self {
        let album = if book.title.is_empty() {
            fallback_album.to_string()
        } else {
            book.title.clone()
        };
        Self {
            album,
            artist: book.first_author().unwrap_or(fallback_artist).to_string(),
            year: book.year(),
            genre: book.first_genre().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlannerOptions {
    pub style: FilenameStyle,
    /// Allowed overshoot of a chapter end past the total runtime.
    pub tolerance_secs: f64,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            style: FilenameStyle::Underscore,
            tolerance_secs: 2.0,
        }
    }
}

/// Metadata written into one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub title: String,
    /// `index/total`
    pub track: String,
    pub album: String,
    pub artist: String,
    pub year: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterPlanEntry {
    /// 1-based position in the catalog's chapter list.
    pub index: usize,
    pub file_name: String,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub tags: TagSet,
}

impl ChapterPlanEntry {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFault {
    /// Start or duration below zero.
    Negative,
    /// Ends past the total runtime by more than the tolerance.
    ExceedsTotal,
    /// Starts before the previously planned chapter starts.
    OutOfOrder,
    /// Nothing to cut after clamping to the runtime.
    Empty,
    /// No declared length and no following start to derive it from.
    NoBoundary,
    NotFinite,
}

impl fmt::Display for RangeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RangeFault::Negative => "negative start or duration",
            RangeFault::ExceedsTotal => "ends after the end of the audio",
            RangeFault::OutOfOrder => "starts before the previous chapter",
            RangeFault::Empty => "has no audio left to cut",
            RangeFault::NoBoundary => "has no length and no following start offset",
            RangeFault::NotFinite => "has a non-numeric offset or length",
        };
        f.write_str(text)
    }
}

/// A chapter dropped from the plan. Not an error: the rest of the plan is
/// still usable.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRangeInvalid {
    pub index: usize,
    pub title: String,
    pub start_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub fault: RangeFault,
}

impl fmt::Display for ChapterRangeInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chapter {} '{}' {}", self.index, self.title, self.fault)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub entries: Vec<ChapterPlanEntry>,
    pub excluded: Vec<ChapterRangeInvalid>,
    /// Measured runtime of the concatenated inputs.
    pub total_duration_secs: f64,
    /// Number of chapters the catalog reported, planned or not.
    pub chapter_count: usize,
}

impl Plan {
    /// True when every catalog chapter made it into the plan.
    pub fn is_complete(&self) -> bool {
        self.excluded.is_empty()
    }

    pub fn planned_duration_secs(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_secs).sum()
    }
}

/// Build the cutting plan for `chapters` over a timeline of `total_secs`.
pub fn plan_chapters(
    chapters: &[ChapterSpec],
    total_secs: f64,
    book: &BookTags,
    options: &PlannerOptions,
) -> Result<Plan, SplitError> {
    if chapters.is_empty() {
        return Err(SplitError::EmptyChapterList);
    }

    let count = chapters.len();
    let mut entries: Vec<ChapterPlanEntry> = Vec::with_capacity(count);
    let mut excluded = Vec::new();
    // End of the previous chapter, used when a start offset is missing.
    let mut cursor = Some(0.0);

    for (pos, chapter) in chapters.iter().enumerate() {
        let index = pos + 1;
        let title = display_title(chapter, index);
        let next = chapters.get(pos + 1);
        let previous_start = entries.last().map(|e| e.start_secs);

        let resolved = resolve_range(chapter, next, cursor, total_secs, previous_start, options);
        cursor = match &resolved {
            Ok((start, duration)) => Some(start + duration),
            Err((start, duration, _)) => match (start, duration) {
                (Some(s), Some(d)) if s.is_finite() && d.is_finite() => Some(s + d),
                _ => None,
            },
        };

        match resolved {
            Ok((start_secs, duration_secs)) => entries.push(ChapterPlanEntry {
                index,
                file_name: output_file_name(index, &title, options.style),
                start_secs,
                duration_secs,
                tags: TagSet {
                    title,
                    track: format!("{}/{}", index, count),
                    album: book.album.clone(),
                    artist: book.artist.clone(),
                    year: book.year.clone(),
                    genre: book.genre.clone(),
                },
            }),
            Err((start_secs, duration_secs, fault)) => excluded.push(ChapterRangeInvalid {
                index,
                title,
                start_secs,
                duration_secs,
                fault,
            }),
        }
    }

    Ok(Plan {
        entries,
        excluded,
        total_duration_secs: total_secs,
        chapter_count: count,
    })
}

type RangeResult = Result<(f64, f64), (Option<f64>, Option<f64>, RangeFault)>;

fn resolve_range(
    chapter: &ChapterSpec,
    next: Option<&ChapterSpec>,
    cursor: Option<f64>,
    total_secs: f64,
    previous_start: Option<f64>,
    options: &PlannerOptions,
) -> RangeResult {
    let declared_start = chapter.start_secs;
    let declared_duration = chapter.duration_secs;
    let fail = |start: Option<f64>, duration: Option<f64>, fault: RangeFault| -> RangeResult {
        Err((start, duration, fault))
    };

    let non_finite = |v: Option<f64>| v.is_some_and(|v| !v.is_finite());
    if non_finite(declared_start) || non_finite(declared_duration) {
        return fail(declared_start, declared_duration, RangeFault::NotFinite);
    }

    let Some(start) = declared_start.or(cursor) else {
        return fail(None, declared_duration, RangeFault::NoBoundary);
    };

    let duration = match declared_duration.filter(|d| *d > 0.0) {
        Some(duration) => duration,
        None => match next.map(|n| n.start_secs) {
            None => total_secs - start,
            Some(Some(next_start)) if next_start.is_finite() => next_start - start,
            Some(Some(_)) => return fail(Some(start), None, RangeFault::NotFinite),
            Some(None) => return fail(Some(start), None, RangeFault::NoBoundary),
        },
    };

    if start < 0.0 || duration < 0.0 {
        return fail(Some(start), Some(duration), RangeFault::Negative);
    }
    // Chapters may overlap; only a start before the previous start breaks the order.
    if previous_start.is_some_and(|prev| start < prev) {
        return fail(Some(start), Some(duration), RangeFault::OutOfOrder);
    }

    let end = start + duration;
    if end > total_secs + options.tolerance_secs {
        return fail(Some(start), Some(duration), RangeFault::ExceedsTotal);
    }

    // Within tolerance: trim the overshoot so the cut never runs past the audio.
    let duration = if end > total_secs {
        total_secs - start
    } else {
        duration
    };
    if duration <= 0.0 {
        return fail(Some(start), Some(duration), RangeFault::Empty);
    }

    Ok((start, duration))
}

/// Title shown to the user and written to the title tag.
fn display_title(chapter: &ChapterSpec, index: usize) -> String {
    chapter
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Chapter {}", index))
}

fn is_forbidden(c: char) -> bool {
    FORBIDDEN_CHARS.contains(&c) || c.is_control()
}

/// Make `title` safe to use inside a file name.
///
/// Forbidden characters are dropped together with any whitespace directly
/// around them, so `"Chapter: One/Two?"` becomes `"ChapterOneTwo"` rather than
/// `"Chapter OneTwo"`. The result is trimmed and capped at
/// [`MAX_TITLE_CHARS`]. Applying it twice changes nothing.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut chars = title.chars().peekable();

    while let Some(c) = chars.next() {
        if is_forbidden(c) {
            out.truncate(out.trim_end().len());
            while chars.peek().is_some_and(|next| next.is_whitespace() && !is_forbidden(*next)) {
                chars.next();
            }
            continue;
        }
        out.push(c);
    }

    let capped: String = out.trim().chars().take(MAX_TITLE_CHARS).collect();
    capped.trim_end().to_string()
}

pub fn output_file_name(index: usize, title: &str, style: FilenameStyle) -> String {
    let mut fragment = sanitize_title(title);
    if fragment.is_empty() {
        fragment = format!("Chapter {}", index);
    }
    match style {
        FilenameStyle::Underscore => format!("{:02}_{}.mp3", index, fragment),
        FilenameStyle::Dashed => format!("{:02} - {}.mp3", index, fragment),
    }
}
