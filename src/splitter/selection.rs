use super::catalog::CandidateBook;
use super::metadata::SearchSeed;

/// Outcome of one answer to the "select a book" prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Zero-based index into the candidate list.
    Select(usize),
    Retry(RetryReason),
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The user asked to search with their own title and author.
    ManualSearch,
    /// The answer could not be used; ask again.
    InvalidInput(String),
}

/// Interpret `input` against `candidates`.
///
/// `0` switches to manual search, `q` aborts, `1..=n` selects. Everything
/// else asks again with a hint.
pub fn choose_candidate(candidates: &[CandidateBook], input: &str) -> Choice {
    let answer = input.trim();
    if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
        return Choice::Abort;
    }
    if candidates.is_empty() {
        return Choice::Retry(RetryReason::ManualSearch);
    }

    let count = candidates.len();
    match answer.parse::<usize>() {
        Ok(0) => Choice::Retry(RetryReason::ManualSearch),
        Ok(n) if n <= count => Choice::Select(n - 1),
        Ok(_) => Choice::Retry(RetryReason::InvalidInput(format!(
            "Please enter a number between 1 and {}",
            count
        ))),
        Err(_) => Choice::Retry(RetryReason::InvalidInput(
            "Please enter a valid number".to_string(),
        )),
    }
}

/// Pick a candidate without asking: the one carrying the seed's ASIN, or the
/// only hit when the caller accepted unambiguous matches up front.
pub fn auto_select(candidates: &[CandidateBook], seed: &SearchSeed, assume_yes: bool) -> Option<usize> {
    if let Some(asin) = seed.asin.as_deref() {
        let hit = candidates
            .iter()
            .position(|c| c.asin.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(asin)));
        if hit.is_some() {
            return hit;
        }
    }
    (assume_yes && candidates.len() == 1).then_some(0)
}
