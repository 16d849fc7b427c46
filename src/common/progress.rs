use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::{OutputFormat, get_output_format, is_debug_enabled};

/// Bars and spinners would interleave with JSON lines or streamed tool output.
fn progress_visible() -> bool {
    matches!(get_output_format(), OutputFormat::Text) && !is_debug_enabled()
}

pub fn create_spinner(message: String) -> ProgressBar {
    if !progress_visible() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋ "),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Bar over a known number of work items (plan entries).
pub fn create_bar(length: u64, message: String) -> ProgressBar {
    if !progress_visible() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
