use std::collections::HashSet;

use capref_core::CaptionCandidate;

/// Title characters that take part in the duplicate key.
pub const TITLE_KEY_CHARS: usize = 50;

/// Key under which two candidates count as the same caption.
pub fn dedup_key(candidate: &CaptionCandidate) -> (u32, String, String) {
    (
        candidate.page,
        candidate.number.clone(),
        candidate.title.chars().take(TITLE_KEY_CHARS).collect(),
    )
}

/// Drop candidates whose `(page, number, title prefix)` was already seen.
/// The first occurrence wins and order is preserved.
pub fn deduplicate(candidates: Vec<CaptionCandidate>) -> Vec<CaptionCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(dedup_key(c)))
        .collect()
}
