//! Round gate: decides from effective results whether the active round may advance.

use crate::logic::staging::ResultStagingStore;
use crate::models::{Match, Outcome};

/// The result shown to the administrator: the staged edit if any (including an explicit
/// reset to undecided), else the persisted result.
pub fn effective_result(m: &Match, staging: &ResultStagingStore) -> Option<Outcome> {
    staging.get(m.id).unwrap_or(m.persisted_result)
}

/// Number of matches whose effective result is undecided.
pub fn undecided_count(matches: &[Match], staging: &ResultStagingStore) -> usize {
    matches
        .iter()
        .filter(|m| effective_result(m, staging).is_none())
        .count()
}

/// True iff no match in the round has an undecided effective result.
pub fn can_advance(matches: &[Match], staging: &ResultStagingStore) -> bool {
    undecided_count(matches, staging) == 0
}

/// A match is editable while it has no persisted result or still carries a staged edit.
/// Committed results are read-only.
pub fn can_edit_match(m: &Match, staging: &ResultStagingStore) -> bool {
    m.persisted_result.is_none() || staging.contains(m.id)
}
