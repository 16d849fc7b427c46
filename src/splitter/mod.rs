//! Audiobook chapter splitting.

pub mod catalog;
pub mod config;
pub mod cutter;
pub mod discovery;
pub mod display;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod planner;
pub mod probe;
pub mod prompt;
pub mod report;
pub mod selection;
pub mod session;
pub mod tagger;
pub mod tool_log;
