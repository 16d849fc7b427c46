mod common;
mod splitter;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::common::paths;
use crate::splitter::catalog::AudiMetaClient;
use crate::splitter::config::SplitterConfig;
use crate::splitter::ffmpeg::SystemFfmpeg;
use crate::splitter::probe::FfprobeProbe;
use crate::splitter::prompt::TerminalPrompter;
use crate::splitter::report;
use crate::splitter::session::{Collaborators, Session, SessionOptions};
use crate::splitter::tagger::Id3Tagger;
use crate::splitter::tool_log::ToolCommandLogger;
use crate::ui::prelude::*;

/// Split an audiobook into tagged per-chapter MP3 files using AudiMeta chapter data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder containing the audiobook's MP3 files
    folder: String,

    /// Show debug output and stream ffmpeg diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Emit one JSON object per line instead of text
    #[arg(long)]
    json: bool,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Skip the search and use this ASIN
    #[arg(long)]
    asin: Option<String>,

    /// Accept a single search match without asking
    #[arg(short = 'y', long)]
    yes: bool,

    /// Show the cutting plan and stop before writing anything
    #[arg(long)]
    dry_run: bool,

    /// Keep the original files after a successful split
    #[arg(long)]
    keep_originals: bool,
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let color = !cli.no_color && !cli.json;
    if !color {
        colored::control::set_override(false);
    }
    ui::init(format, color);
    ui::set_debug_mode(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            emit(
                Level::Error,
                "split.fatal",
                &format!("{} {:#}", char::from(NerdFont::Cross), e),
                None,
            );
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.as_deref().map(paths::expand_user_path);
    let config = SplitterConfig::load_from(config_path.as_deref())
        .context("Failed to load configuration")?;

    let folder: PathBuf = paths::expand_user_path(&cli.folder);

    let logger = if cli.verbose {
        match ToolCommandLogger::new() {
            Ok(logger) => {
                emit(
                    Level::Debug,
                    "split.tool_log.path",
                    &format!("Logging tool invocations to {}", logger.log_file_path().display()),
                    None,
                );
                Some(logger)
            }
            Err(e) => {
                emit(
                    Level::Debug,
                    "split.tool_log.unavailable",
                    &format!("Tool log disabled: {:#}", e),
                    None,
                );
                None
            }
        }
    } else {
        None
    };

    let catalog = AudiMetaClient::new(&config).context("Failed to set up the catalog client")?;
    let probe = FfprobeProbe::new(config.ffprobe_bin.clone(), logger.clone());
    let media = SystemFfmpeg::new(config.ffmpeg_bin.clone(), logger);
    let tagger = Id3Tagger;
    let prompter = TerminalPrompter;

    let options = SessionOptions {
        folder,
        asin: cli.asin,
        assume_yes: cli.yes,
        dry_run: cli.dry_run,
        keep_originals: cli.keep_originals,
        required_tools: vec![config.ffmpeg_bin.clone(), config.ffprobe_bin.clone()],
    };
    let deps = Collaborators {
        catalog: &catalog,
        probe: &probe,
        media: &media,
        tagger: &tagger,
        prompter: &prompter,
    };

    let ctx = Session::new(&config, options, deps).run();
    report::print_report(&ctx.report);
    Ok(ctx.report.exit_code())
}
