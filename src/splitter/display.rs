use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde_json::json;

use super::catalog::{CandidateBook, ChapterSpec};
use super::planner::Plan;
use crate::ui::prelude::*;

const UNKNOWN: &str = "Unknown";
const GENRES_WIDTH: usize = 50;

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN).to_string()
}

/// `12h 5m` from whole minutes.
pub fn format_minutes(minutes: Option<u64>) -> String {
    match minutes {
        Some(m) if m >= 60 => format!("{}h {}m", m / 60, m % 60),
        Some(m) => format!("{}m", m),
        None => UNKNOWN.to_string(),
    }
}

pub fn format_genres(genres: &[String]) -> String {
    if genres.is_empty() {
        return UNKNOWN.to_string();
    }
    let joined = genres.join(", ");
    if joined.chars().count() <= GENRES_WIDTH {
        return joined;
    }
    let mut short: String = joined.chars().take(GENRES_WIDTH - 3).collect();
    short.push_str("...");
    short
}

/// Table cells for one search hit, numbered from 1.
pub fn candidate_row(number: usize, book: &CandidateBook) -> Vec<String> {
    let title = if book.title.is_empty() {
        UNKNOWN.to_string()
    } else {
        book.title.clone()
    };
    let release = book
        .release_date
        .as_deref()
        .map(|date| date.chars().take(10).collect::<String>());

    vec![
        number.to_string(),
        title,
        or_unknown(book.first_author()),
        format_minutes(book.length_minutes),
        or_unknown(release.as_deref()),
        or_unknown(book.publisher.as_deref()),
        format_genres(&book.genres),
        or_unknown(book.asin.as_deref()),
    ]
}

pub fn show_candidates(candidates: &[CandidateBook]) {
    let mut table = new_table(&[
        "#",
        "Title",
        "Author",
        "Duration",
        "Release",
        "Publisher",
        "Genres",
        "ASIN",
    ]);
    for (idx, book) in candidates.iter().enumerate() {
        table.add_row(candidate_row(idx + 1, book));
    }

    let data: Vec<_> = candidates
        .iter()
        .map(|book| {
            json!({
                "title": book.title,
                "authors": book.authors,
                "asin": book.asin,
                "release_date": book.release_date,
                "publisher": book.publisher,
                "genres": book.genres,
                "length_minutes": book.length_minutes,
            })
        })
        .collect();

    emit(
        Level::Info,
        "split.catalog.results",
        &format!(
            "{} Search results ({}):",
            char::from(NerdFont::Search),
            candidates.len()
        ),
        Some(json!({ "candidates": data })),
    );
    print_block(&table.to_string());
}

fn format_secs(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "-".to_string())
}

pub fn show_chapters(chapters: &[ChapterSpec]) {
    let mut table = new_table(&["#", "Title", "Start (s)", "Duration (s)"]);
    for (idx, chapter) in chapters.iter().enumerate() {
        table.add_row(vec![
            (idx + 1).to_string(),
            chapter
                .title
                .clone()
                .unwrap_or_else(|| format!("Chapter {}", idx + 1)),
            format_secs(chapter.start_secs),
            format_secs(chapter.duration_secs),
        ]);
    }

    emit(
        Level::Info,
        "split.chapters.fetched",
        &format!(
            "{} Found {} chapters",
            char::from(NerdFont::List),
            chapters.len()
        ),
        Some(json!({ "count": chapters.len() })),
    );
    print_block(&table.to_string());
}

pub fn show_plan(plan: &Plan) {
    let mut rows: Vec<(usize, Vec<String>)> = plan
        .entries
        .iter()
        .map(|entry| {
            (
                entry.index,
                vec![
                    entry.index.to_string(),
                    entry.file_name.clone(),
                    format!("{:.3}", entry.start_secs),
                    format!("{:.3}", entry.duration_secs),
                    "planned".to_string(),
                ],
            )
        })
        .chain(plan.excluded.iter().map(|skip| {
            (
                skip.index,
                vec![
                    skip.index.to_string(),
                    skip.title.clone(),
                    format_secs(skip.start_secs),
                    format_secs(skip.duration_secs),
                    format!("excluded: {}", skip.fault),
                ],
            )
        }))
        .collect();
    rows.sort_by_key(|(index, _)| *index);

    let mut table = new_table(&["#", "Output file", "Start (s)", "Duration (s)", "Status"]);
    for (_, row) in rows {
        table.add_row(row);
    }

    let entries: Vec<_> = plan
        .entries
        .iter()
        .map(|e| {
            json!({
                "index": e.index,
                "file": e.file_name,
                "start": e.start_secs,
                "duration": e.duration_secs,
                "end": e.end_secs(),
                "track": e.tags.track,
            })
        })
        .collect();
    let excluded: Vec<_> = plan
        .excluded
        .iter()
        .map(|skip| json!({ "index": skip.index, "title": skip.title, "reason": skip.fault.to_string() }))
        .collect();

    emit(
        Level::Info,
        "split.plan.ready",
        &format!(
            "{} Cutting plan: {} of {} chapters, {:.1}s of {:.1}s audio",
            char::from(NerdFont::List),
            plan.entries.len(),
            plan.chapter_count,
            plan.planned_duration_secs(),
            plan.total_duration_secs
        ),
        Some(json!({ "entries": entries, "excluded": excluded })),
    );
    print_block(&table.to_string());
}
