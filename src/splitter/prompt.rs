use dialoguer::{Confirm, Input};

use super::error::SplitError;

/// Reads answers from the user.
pub trait Prompter {
    /// Free-text answer; may be empty.
    fn ask(&self, prompt: &str) -> Result<String, SplitError>;
    fn confirm(&self, prompt: &str) -> Result<bool, SplitError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, prompt: &str) -> Result<String, SplitError> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map(|answer| answer.trim().to_string())
            .map_err(|e| SplitError::Prompt(e.to_string()))
    }

    fn confirm(&self, prompt: &str) -> Result<bool, SplitError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| SplitError::Prompt(e.to_string()))
    }
}
