//! Session orchestration.
//!
//! One run walks `Init → FilesDiscovered → MetadataExtracted → BookResolved →
//! ChaptersFetched → Planned → Cutting → Done`. Stages receive the
//! [`SessionContext`] and return their product or a terminal error; nothing
//! is kept in globals. Original files are only removed after every chapter
//! was cut and found on disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::catalog::{CandidateBook, CatalogApi, ChapterSpec, SearchQuery};
use super::config::SplitterConfig;
use super::cutter::{ExecutionResult, MediaCutter, same_file};
use super::discovery::{self, InputFile};
use super::display;
use super::error::SplitError;
use super::ffmpeg::{self, MediaTool};
use super::metadata::{self, SearchSeed};
use super::planner::{self, BookTags, Plan, PlannerOptions};
use super::probe::{self, DurationProbe};
use super::prompt::Prompter;
use super::report::{Outcome, PartialReason, SessionReport};
use super::selection::{Choice, RetryReason, auto_select, choose_candidate};
use super::tagger::Tagger;
use crate::common::progress::create_spinner;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    FilesDiscovered,
    MetadataExtracted,
    BookResolved,
    ChaptersFetched,
    Planned,
    Cutting,
    Done(Outcome),
}

/// Per-run switches taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub folder: PathBuf,
    /// Skip the search and resolve this book directly.
    pub asin: Option<String>,
    /// Accept a single unambiguous match without confirmation.
    pub assume_yes: bool,
    pub dry_run: bool,
    pub keep_originals: bool,
    /// Executables that must be installed before probing starts.
    pub required_tools: Vec<String>,
}

/// External collaborators of a session.
pub struct Collaborators<'a> {
    pub catalog: &'a dyn CatalogApi,
    pub probe: &'a dyn DurationProbe,
    pub media: &'a dyn MediaTool,
    pub tagger: &'a dyn Tagger,
    pub prompter: &'a dyn Prompter,
}

/// State threaded through the stages of one run.
#[derive(Debug)]
pub struct SessionContext {
    pub state: SessionState,
    pub report: SessionReport,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            state: SessionState::Init,
            report: SessionReport::new(Utc::now()),
        }
    }

    fn advance(&mut self, state: SessionState) {
        emit(
            Level::Debug,
            "split.session.state",
            &format!("{:?} -> {:?}", self.state, state),
            None,
        );
        self.state = state;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// How the stages ended when no error was raised.
enum Finish {
    Done(Outcome),
    /// The user left the book selection.
    Aborted,
    DryRun,
}

pub struct Session<'a> {
    config: &'a SplitterConfig,
    options: SessionOptions,
    deps: Collaborators<'a>,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a SplitterConfig, options: SessionOptions, deps: Collaborators<'a>) -> Self {
        Self {
            config,
            options,
            deps,
        }
    }

    /// Run every stage and return the finished context. Never fails: errors
    /// are reported and folded into a `Failed` outcome.
    pub fn run(&self) -> SessionContext {
        let mut ctx = SessionContext::new();
        emit(
            Level::Info,
            "split.session.start",
            &format!(
                "{} Processing folder {}",
                char::from(NerdFont::Folder),
                self.options.folder.display()
            ),
            None,
        );

        let outcome = match self.drive(&mut ctx) {
            Ok(Finish::Done(outcome)) => outcome,
            Ok(Finish::DryRun) => {
                ctx.report.dry_run = true;
                ctx.report.cut_succeeded = true;
                Outcome::Success
            }
            Ok(Finish::Aborted) => {
                emit(
                    Level::Warn,
                    "split.session.aborted",
                    &format!(
                        "{} No book selected; nothing was changed.",
                        char::from(NerdFont::Warning)
                    ),
                    None,
                );
                Outcome::Failed
            }
            Err(err) => {
                emit(
                    Level::Error,
                    err.code(),
                    &format!("{} {}", char::from(NerdFont::Cross), err),
                    None,
                );
                Outcome::Failed
            }
        };

        ctx.report.outcome = outcome;
        ctx.report.finished_at = Utc::now();
        ctx.advance(SessionState::Done(outcome));
        ctx
    }

    fn drive(&self, ctx: &mut SessionContext) -> Result<Finish, SplitError> {
        let sources = self.discover(ctx)?;
        let seed = self.extract_metadata(ctx, &sources);

        let Some(book) = self.resolve_book(ctx, &seed)? else {
            return Ok(Finish::Aborted);
        };
        let chapters = self.fetch_chapters(ctx, &book)?;

        for tool in &self.options.required_tools {
            ffmpeg::locate(tool)?;
        }
        let inputs = self.probe_inputs(&sources)?;

        let plan = self.plan(ctx, &chapters, &inputs, &book)?;
        if self.options.dry_run {
            return Ok(Finish::DryRun);
        }

        ctx.advance(SessionState::Cutting);
        let cutter = MediaCutter::new(self.deps.media, self.deps.tagger);
        let result = cutter.execute(&self.options.folder, &inputs, &plan)?;
        ctx.report.cut = result.cut_count();
        ctx.report.tag_failures = result.tag_failures();

        Ok(Finish::Done(self.finish(ctx, &plan, &result, &sources)))
    }

    fn discover(&self, ctx: &mut SessionContext) -> Result<Vec<PathBuf>, SplitError> {
        let sources = discovery::discover_inputs(&self.options.folder)?;
        emit(
            Level::Info,
            "split.discovery.found",
            &format!(
                "{} Found {} MP3 file(s)",
                char::from(NerdFont::File),
                sources.len()
            ),
            Some(serde_json::json!({
                "files": sources.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()
            })),
        );
        ctx.advance(SessionState::FilesDiscovered);
        Ok(sources)
    }

    fn extract_metadata(&self, ctx: &mut SessionContext, sources: &[PathBuf]) -> SearchSeed {
        let seed = match sources.first() {
            Some(first) => metadata::extract_seed(first, &self.config.region),
            None => SearchSeed::fallback(&self.config.region),
        };
        ctx.advance(SessionState::MetadataExtracted);
        seed
    }

    fn resolve_book(
        &self,
        ctx: &mut SessionContext,
        seed: &SearchSeed,
    ) -> Result<Option<CandidateBook>, SplitError> {
        let asin = self.options.asin.clone().or_else(|| seed.asin.clone());

        let book = match asin {
            Some(asin) => Some(self.lookup_asin(&asin, seed)?),
            None if seed.is_searchable() => self.search_from_seed(seed)?,
            None => {
                emit(
                    Level::Info,
                    "split.catalog.manual",
                    &format!(
                        "{} Not enough tag data for a search; please search manually.",
                        char::from(NerdFont::Info)
                    ),
                    None,
                );
                self.manual_search()?
            }
        };

        if let Some(book) = &book {
            emit(
                Level::Success,
                "split.catalog.resolved",
                &format!(
                    "{} Using \"{}\" by {} ({})",
                    char::from(NerdFont::Check),
                    book.title,
                    book.first_author().unwrap_or("Unknown"),
                    book.asin.as_deref().unwrap_or("no ASIN")
                ),
                None,
            );
            ctx.advance(SessionState::BookResolved);
        }
        Ok(book)
    }

    /// A known ASIN is an automatic match. When the lookup fails the chapter
    /// fetch still only needs the identifier, so the book is filled in from
    /// the file tags.
    fn lookup_asin(&self, asin: &str, seed: &SearchSeed) -> Result<CandidateBook, SplitError> {
        let spinner = create_spinner(format!("Looking up {}...", asin));
        let lookup = self.deps.catalog.book(asin);
        spinner.finish_and_clear();

        match lookup {
            Ok(book) => Ok(book),
            Err(err) if err.is_recoverable() => {
                emit(
                    Level::Warn,
                    err.code(),
                    &format!(
                        "{} Book lookup failed ({}); continuing with the file tags",
                        char::from(NerdFont::Warning),
                        err
                    ),
                    None,
                );
                Ok(CandidateBook {
                    title: seed.title.clone(),
                    authors: if seed.author.is_empty() {
                        Vec::new()
                    } else {
                        vec![seed.author.clone()]
                    },
                    asin: Some(asin.to_string()),
                    ..CandidateBook::default()
                })
            }
            Err(err) => Err(err),
        }
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<CandidateBook>, SplitError> {
        emit(
            Level::Info,
            "split.catalog.search",
            &format!(
                "{} Searching for {}",
                char::from(NerdFont::Search),
                query.describe()
            ),
            None,
        );
        let spinner = create_spinner("Searching AudiMeta...".to_string());
        let result = self.deps.catalog.search(query);
        spinner.finish_and_clear();
        match result {
            Ok(hits) if hits.is_empty() => Err(SplitError::NoMatch {
                query: query.describe(),
            }),
            other => other,
        }
    }

    fn search_from_seed(&self, seed: &SearchSeed) -> Result<Option<CandidateBook>, SplitError> {
        let query = SearchQuery {
            title: seed.title.clone(),
            author: seed.author.clone(),
            region: seed.region.clone(),
        };
        match self.search(&query) {
            Ok(candidates) => self.choose(candidates, seed),
            Err(err) if err.is_recoverable() => {
                emit(
                    Level::Warn,
                    err.code(),
                    &format!("{} {}", char::from(NerdFont::Warning), err),
                    None,
                );
                self.manual_search()
            }
            Err(err) => Err(err),
        }
    }

    /// Let the user pick one of `candidates`, possibly via manual search.
    fn choose(
        &self,
        candidates: Vec<CandidateBook>,
        seed: &SearchSeed,
    ) -> Result<Option<CandidateBook>, SplitError> {
        if let Some(idx) = auto_select(&candidates, seed, self.options.assume_yes) {
            emit(
                Level::Info,
                "split.catalog.auto_selected",
                &format!(
                    "{} Single match found, selecting it automatically",
                    char::from(NerdFont::Check)
                ),
                None,
            );
            return Ok(candidates.into_iter().nth(idx));
        }

        display::show_candidates(&candidates);
        let prompt = format!(
            "Select a book (1-{}, 0 to search manually, q to quit)",
            candidates.len()
        );

        loop {
            let answer = self.deps.prompter.ask(&prompt)?;
            match choose_candidate(&candidates, &answer) {
                Choice::Select(idx) => {
                    let picked = &candidates[idx];
                    emit(
                        Level::Info,
                        "split.catalog.selected",
                        &format!(
                            "Selected: {} by {}",
                            picked.title,
                            picked.first_author().unwrap_or("Unknown")
                        ),
                        None,
                    );
                    if self.deps.prompter.confirm("Is this correct?")? {
                        return Ok(Some(picked.clone()));
                    }
                    if !self
                        .deps
                        .prompter
                        .confirm("Would you like to select another book?")?
                    {
                        return self.manual_search();
                    }
                }
                Choice::Retry(RetryReason::ManualSearch) => return self.manual_search(),
                Choice::Retry(RetryReason::InvalidInput(hint)) => {
                    emit(Level::Warn, "split.prompt.invalid", &hint, None);
                }
                Choice::Abort => return Ok(None),
            }
        }
    }

    fn manual_search(&self) -> Result<Option<CandidateBook>, SplitError> {
        loop {
            let title = self
                .deps
                .prompter
                .ask("Enter book title (or press Enter to exit)")?;
            if title.is_empty() {
                return Ok(None);
            }
            let author = self.deps.prompter.ask("Enter author name")?;

            let query = SearchQuery {
                title,
                author,
                region: self.config.region.clone(),
            };
            match self.search(&query) {
                Ok(candidates) => {
                    let seed = SearchSeed {
                        title: query.title,
                        author: query.author,
                        region: query.region,
                        asin: None,
                    };
                    return self.choose(candidates, &seed);
                }
                Err(SplitError::NoMatch { .. }) => {
                    emit(
                        Level::Info,
                        "split.catalog.no_match",
                        "No results found.",
                        None,
                    );
                    if !self
                        .deps
                        .prompter
                        .confirm("Would you like to try another search?")?
                    {
                        return Ok(None);
                    }
                }
                Err(err) if err.is_recoverable() => {
                    emit(
                        Level::Warn,
                        err.code(),
                        &format!("{} Search error: {}", char::from(NerdFont::Warning), err),
                        None,
                    );
                    if !self.deps.prompter.confirm("Would you like to try again?")? {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn fetch_chapters(
        &self,
        ctx: &mut SessionContext,
        book: &CandidateBook,
    ) -> Result<Vec<ChapterSpec>, SplitError> {
        let asin = book.asin.as_deref().ok_or_else(|| SplitError::ChapterFetch {
            asin: "-".to_string(),
            message: "the selected book has no ASIN".to_string(),
        })?;

        let spinner = create_spinner(format!("Fetching chapters for {}...", asin));
        let chapters = self.deps.catalog.chapters(asin);
        spinner.finish_and_clear();
        let chapters = chapters?;

        if chapters.is_empty() {
            return Err(SplitError::EmptyChapterList);
        }
        display::show_chapters(&chapters);
        ctx.advance(SessionState::ChaptersFetched);
        Ok(chapters)
    }

    fn probe_inputs(&self, sources: &[PathBuf]) -> Result<Vec<InputFile>, SplitError> {
        let spinner = create_spinner(format!("Measuring {} file(s)...", sources.len()));
        let inputs = probe::probe_inputs(self.deps.probe, sources);
        spinner.finish_and_clear();
        let inputs = inputs?;

        let total = discovery::total_duration(&inputs);
        emit(
            Level::Info,
            "split.probe.total",
            &format!(
                "{} Total duration: {} ({:.1}s)",
                char::from(NerdFont::Timer),
                clock(total),
                total
            ),
            Some(serde_json::json!({ "total_secs": total })),
        );
        Ok(inputs)
    }

    fn plan(
        &self,
        ctx: &mut SessionContext,
        chapters: &[ChapterSpec],
        inputs: &[InputFile],
        book: &CandidateBook,
    ) -> Result<Plan, SplitError> {
        let tags = BookTags::from_book(
            book,
            &self.config.fallback_artist,
            &self.config.fallback_album,
        );
        let options = PlannerOptions {
            style: self.config.filename_style,
            tolerance_secs: self.config.duration_tolerance_secs,
        };
        let plan = planner::plan_chapters(
            chapters,
            discovery::total_duration(inputs),
            &tags,
            &options,
        )?;

        for skipped in &plan.excluded {
            emit(
                Level::Warn,
                "split.plan.excluded",
                &format!(
                    "{} Skipping {}",
                    char::from(NerdFont::Warning),
                    skipped
                ),
                None,
            );
        }
        display::show_plan(&plan);

        ctx.report.planned = plan.entries.len();
        ctx.report.excluded = plan.excluded.len();
        if plan.entries.is_empty() {
            return Err(SplitError::EmptyPlan);
        }
        ctx.advance(SessionState::Planned);
        Ok(plan)
    }

    /// Decide the outcome and, when it is safe, remove the originals.
    fn finish(
        &self,
        ctx: &mut SessionContext,
        plan: &Plan,
        result: &ExecutionResult,
        sources: &[PathBuf],
    ) -> Outcome {
        if !result.all_cut() || !result.outputs_present() {
            emit(
                Level::Error,
                "split.cleanup.skipped",
                &format!(
                    "{} {} of {} chapters failed; original files were kept.",
                    char::from(NerdFont::Cross),
                    plan.entries.len() - result.cut_count(),
                    plan.entries.len()
                ),
                None,
            );
            return Outcome::Failed;
        }
        ctx.report.cut_succeeded = true;

        if !plan.is_complete() {
            emit(
                Level::Warn,
                "split.cleanup.skipped",
                &format!(
                    "{} {} chapter(s) were left out of the plan; original files were kept.",
                    char::from(NerdFont::Warning),
                    plan.excluded.len()
                ),
                None,
            );
            ctx.report.partial_reason = Some(PartialReason::ChaptersExcluded);
            return Outcome::Partial;
        }

        if self.options.keep_originals || !self.config.delete_originals {
            emit(
                Level::Info,
                "split.cleanup.kept",
                &format!("{} Keeping original files", char::from(NerdFont::Info)),
                None,
            );
            return Outcome::Success;
        }

        let outputs: Vec<&Path> = result.outputs().collect();
        let mut cleanup_ok = true;
        for source in sources {
            // A chapter may have been written over an input of the same name
            if outputs.iter().any(|out| same_file(source, out)) {
                continue;
            }
            match fs::remove_file(source) {
                Ok(()) => {
                    ctx.report.originals_removed += 1;
                    emit(
                        Level::Info,
                        "split.cleanup.removed",
                        &format!(
                            "{} Removed original file: {}",
                            char::from(NerdFont::Trash),
                            source.display()
                        ),
                        None,
                    );
                }
                Err(err) => {
                    cleanup_ok = false;
                    emit(
                        Level::Warn,
                        "split.cleanup.failed",
                        &format!(
                            "{} Error removing file {}: {}",
                            char::from(NerdFont::Warning),
                            source.display(),
                            err
                        ),
                        None,
                    );
                }
            }
        }

        if cleanup_ok {
            Outcome::Success
        } else {
            ctx.report.partial_reason = Some(PartialReason::CleanupFailed);
            Outcome::Partial
        }
    }
}

/// `H:MM:SS` for a duration in seconds.
fn clock(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::cutter::tests::{FakeTagger, FakeTool};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeCatalog {
        hits: Vec<CandidateBook>,
        fail_search: bool,
        book: Option<CandidateBook>,
        /// `None` makes the chapter request fail.
        chapters: Option<Vec<ChapterSpec>>,
        searches: Cell<usize>,
        chapter_requests: RefCell<Vec<String>>,
    }

    impl CatalogApi for FakeCatalog {
        fn search(&self, _query: &SearchQuery) -> Result<Vec<CandidateBook>, SplitError> {
            self.searches.set(self.searches.get() + 1);
            if self.fail_search {
                return Err(SplitError::CatalogRequest {
                    url: "http://stub/search".into(),
                    message: "connection refused".into(),
                });
            }
            Ok(self.hits.clone())
        }

        fn book(&self, asin: &str) -> Result<CandidateBook, SplitError> {
            self.book.clone().ok_or_else(|| SplitError::CatalogStatus {
                url: format!("http://stub/book/{}", asin),
                status: 404,
                body: "not found".into(),
            })
        }

        fn chapters(&self, asin: &str) -> Result<Vec<ChapterSpec>, SplitError> {
            self.chapter_requests.borrow_mut().push(asin.to_string());
            self.chapters.clone().ok_or_else(|| SplitError::ChapterFetch {
                asin: asin.to_string(),
                message: "catalog returned HTTP 500".into(),
            })
        }
    }

    struct FixedProbe;

    impl DurationProbe for FixedProbe {
        fn duration_secs(&self, _path: &Path) -> Result<f64, SplitError> {
            Ok(600.0)
        }
    }

    #[derive(Default)]
    struct ScriptedPrompter {
        answers: RefCell<VecDeque<String>>,
        confirms: RefCell<VecDeque<bool>>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[&str], confirms: &[bool]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().map(|a| a.to_string()).collect()),
                confirms: RefCell::new(confirms.iter().copied().collect()),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&self, prompt: &str) -> Result<String, SplitError> {
            self.answers
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| SplitError::Prompt(format!("unexpected prompt: {}", prompt)))
        }

        fn confirm(&self, prompt: &str) -> Result<bool, SplitError> {
            self.confirms
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| SplitError::Prompt(format!("unexpected prompt: {}", prompt)))
        }
    }

    fn mother() -> CandidateBook {
        CandidateBook {
            title: "Mother".into(),
            authors: vec!["m.s. RedCherries".into()],
            asin: Some("B0TEST".into()),
            ..CandidateBook::default()
        }
    }

    fn chapters() -> Vec<ChapterSpec> {
        vec![
            ChapterSpec::new("Intro", 0.0, 300.0),
            ChapterSpec::new("Middle", 300.0, 900.0),
            ChapterSpec::new("End", 1200.0, 600.0),
        ]
    }

    fn catalog() -> FakeCatalog {
        FakeCatalog {
            book: Some(mother()),
            chapters: Some(chapters()),
            ..FakeCatalog::default()
        }
    }

    fn book_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["part1.mp3", "part2.mp3", "part3.mp3"] {
            fs::write(dir.path().join(name), b"audio").unwrap();
        }
        dir
    }

    fn options(dir: &Path) -> SessionOptions {
        SessionOptions {
            folder: dir.to_path_buf(),
            asin: Some("B0TEST".into()),
            ..SessionOptions::default()
        }
    }

    fn files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    struct Harness {
        config: SplitterConfig,
        catalog: FakeCatalog,
        tool: FakeTool,
        tagger: FakeTagger,
        prompter: ScriptedPrompter,
    }

    impl Harness {
        fn new(catalog: FakeCatalog) -> Self {
            Self {
                config: SplitterConfig::default(),
                catalog,
                tool: FakeTool::default(),
                tagger: FakeTagger::default(),
                prompter: ScriptedPrompter::default(),
            }
        }

        fn run(&self, options: SessionOptions) -> SessionContext {
            let deps = Collaborators {
                catalog: &self.catalog,
                probe: &FixedProbe,
                media: &self.tool,
                tagger: &self.tagger,
                prompter: &self.prompter,
            };
            Session::new(&self.config, options, deps).run()
        }
    }

    #[test]
    fn full_run_cuts_chapters_and_removes_originals() {
        let dir = book_folder();
        let harness = Harness::new(catalog());

        let ctx = harness.run(options(dir.path()));

        assert_eq!(ctx.state, SessionState::Done(Outcome::Success));
        assert!(ctx.report.cut_succeeded);
        assert_eq!(ctx.report.originals_removed, 3);
        assert_eq!(
            files(dir.path()),
            vec!["01_Intro.mp3", "02_Middle.mp3", "03_End.mp3"]
        );
        assert_eq!(*harness.catalog.chapter_requests.borrow(), vec!["B0TEST"]);
        assert_eq!(harness.tagger.written.borrow()[0].album, "Mother");
    }

    #[test]
    fn failed_removal_makes_the_run_partial() {
        let dir = book_folder();
        let mut harness = Harness::new(catalog());
        harness.tool.remove_during_extract = Some(dir.path().join("part2.mp3"));

        let ctx = harness.run(options(dir.path()));

        assert_eq!(ctx.state, SessionState::Done(Outcome::Partial));
        assert!(ctx.report.cut_succeeded);
        assert_eq!(ctx.report.exit_code(), 0);
        assert_eq!(ctx.report.originals_removed, 2);
        assert_eq!(ctx.report.partial_reason, Some(PartialReason::CleanupFailed));
        assert_eq!(
            files(dir.path()),
            vec!["01_Intro.mp3", "02_Middle.mp3", "03_End.mp3"]
        );
    }

    #[test]
    fn chapter_fetch_failure_leaves_folder_untouched() {
        let dir = book_folder();
        let harness = Harness::new(FakeCatalog {
            book: Some(mother()),
            chapters: None,
            ..FakeCatalog::default()
        });

        let ctx = harness.run(options(dir.path()));

        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert!(!ctx.report.cut_succeeded);
        assert!(harness.tool.calls.borrow().is_empty());
        assert_eq!(files(dir.path()), vec!["part1.mp3", "part2.mp3", "part3.mp3"]);
    }

    #[test]
    fn any_failed_chapter_keeps_originals() {
        let dir = book_folder();
        let mut harness = Harness::new(catalog());
        harness.tool.fail_starts = vec![1200.0];

        let ctx = harness.run(options(dir.path()));

        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert_eq!(ctx.report.cut, 2);
        assert_eq!(
            files(dir.path()),
            vec!["01_Intro.mp3", "02_Middle.mp3", "part1.mp3", "part2.mp3", "part3.mp3"]
        );
    }

    #[test]
    fn excluded_chapter_makes_the_run_partial() {
        let dir = book_folder();
        let mut chapters = chapters();
        chapters.push(ChapterSpec::new("Bonus", 1800.0, 600.0));
        let harness = Harness::new(FakeCatalog {
            book: Some(mother()),
            chapters: Some(chapters),
            ..FakeCatalog::default()
        });

        let ctx = harness.run(options(dir.path()));

        assert_eq!(ctx.state, SessionState::Done(Outcome::Partial));
        assert!(ctx.report.cut_succeeded);
        assert_eq!(ctx.report.excluded, 1);
        assert_eq!(ctx.report.partial_reason, Some(PartialReason::ChaptersExcluded));
        assert!(dir.path().join("part1.mp3").exists());
        assert!(dir.path().join("03_End.mp3").exists());
    }

    #[test]
    fn empty_chapter_list_is_fatal() {
        let dir = book_folder();
        let harness = Harness::new(FakeCatalog {
            book: Some(mother()),
            chapters: Some(Vec::new()),
            ..FakeCatalog::default()
        });

        let ctx = harness.run(options(dir.path()));
        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert!(harness.tool.calls.borrow().is_empty());
    }

    #[test]
    fn plan_without_valid_entries_is_fatal() {
        let dir = book_folder();
        let harness = Harness::new(FakeCatalog {
            book: Some(mother()),
            chapters: Some(vec![ChapterSpec::new("Too long", 0.0, 5000.0)]),
            ..FakeCatalog::default()
        });

        let ctx = harness.run(options(dir.path()));
        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert_eq!(ctx.report.excluded, 1);
        assert!(harness.tool.calls.borrow().is_empty());
    }

    #[test]
    fn keep_originals_flag_is_honoured() {
        let dir = book_folder();
        let harness = Harness::new(catalog());
        let mut opts = options(dir.path());
        opts.keep_originals = true;

        let ctx = harness.run(opts);

        assert_eq!(ctx.state, SessionState::Done(Outcome::Success));
        assert_eq!(files(dir.path()).len(), 6);
    }

    #[test]
    fn dry_run_stops_after_planning() {
        let dir = book_folder();
        let harness = Harness::new(catalog());
        let mut opts = options(dir.path());
        opts.dry_run = true;

        let ctx = harness.run(opts);

        assert!(ctx.report.dry_run);
        assert_eq!(ctx.report.exit_code(), 0);
        assert_eq!(ctx.report.planned, 3);
        assert!(harness.tool.calls.borrow().is_empty());
        assert_eq!(files(dir.path()), vec!["part1.mp3", "part2.mp3", "part3.mp3"]);
    }

    #[test]
    fn failed_lookup_falls_back_to_the_given_asin() {
        let dir = book_folder();
        let harness = Harness::new(FakeCatalog {
            book: None,
            chapters: Some(chapters()),
            ..FakeCatalog::default()
        });

        let ctx = harness.run(options(dir.path()));

        assert_eq!(ctx.state, SessionState::Done(Outcome::Success));
        assert_eq!(harness.tagger.written.borrow()[0].album, "Unknown Title");
        assert_eq!(harness.tagger.written.borrow()[0].artist, "Unknown Author");
    }

    #[test]
    fn untagged_files_lead_to_manual_search_and_selection() {
        let dir = book_folder();
        let mut second = mother();
        second.title = "Mother, Book 2".into();
        second.asin = Some("B0SECOND".into());
        let mut harness = Harness::new(FakeCatalog {
            hits: vec![mother(), second],
            chapters: Some(chapters()),
            ..FakeCatalog::default()
        });
        harness.prompter = ScriptedPrompter::new(&["Mother", "RedCherries", "5", "2"], &[true]);
        let mut opts = options(dir.path());
        opts.asin = None;

        let ctx = harness.run(opts);

        assert_eq!(ctx.state, SessionState::Done(Outcome::Success));
        assert_eq!(harness.catalog.searches.get(), 1);
        assert_eq!(*harness.catalog.chapter_requests.borrow(), vec!["B0SECOND"]);
    }

    #[test]
    fn empty_title_exits_without_changes() {
        let dir = book_folder();
        let mut harness = Harness::new(catalog());
        harness.prompter = ScriptedPrompter::new(&[""], &[]);
        let mut opts = options(dir.path());
        opts.asin = None;

        let ctx = harness.run(opts);

        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert_eq!(harness.catalog.searches.get(), 0);
        assert_eq!(files(dir.path()).len(), 3);
    }

    #[test]
    fn search_errors_offer_a_retry() {
        let dir = book_folder();
        let mut harness = Harness::new(FakeCatalog {
            fail_search: true,
            ..catalog()
        });
        harness.prompter = ScriptedPrompter::new(&["Mother", "", "Mother", ""], &[true, false]);
        let mut opts = options(dir.path());
        opts.asin = None;

        let ctx = harness.run(opts);

        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert_eq!(harness.catalog.searches.get(), 2);
    }

    #[test]
    fn missing_tools_stop_before_probing() {
        let dir = book_folder();
        let harness = Harness::new(catalog());
        let mut opts = options(dir.path());
        opts.required_tools = vec!["definitely-not-an-installed-tool-4711".into()];

        let ctx = harness.run(opts);

        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert!(harness.tool.calls.borrow().is_empty());
    }

    #[test]
    fn empty_folder_fails_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new(catalog());

        let ctx = harness.run(options(dir.path()));
        assert_eq!(ctx.state, SessionState::Done(Outcome::Failed));
        assert!(harness.catalog.chapter_requests.borrow().is_empty());
    }

    #[test]
    fn clock_formats_hours() {
        assert_eq!(clock(1800.0), "0:30:00");
        assert_eq!(clock(3723.4), "1:02:03");
    }
}
