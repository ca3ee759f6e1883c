//! Result staging: administrator edits not yet committed to the remote service.

use crate::models::{MatchId, Outcome, StagedEdit};
use std::collections::HashMap;

/// In-memory map from match id to a proposed result.
///
/// A staged `None` is an explicit reset to undecided and is distinct from "not staged":
/// [`get`](Self::get) returns `Some(None)` for the former and `None` for the latter.
/// Never performs I/O.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultStagingStore {
    edits: HashMap<MatchId, Option<Outcome>>,
}

impl ResultStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the edit for `match_id`.
    pub fn stage(&mut self, match_id: MatchId, result: Option<Outcome>) {
        self.edits.insert(match_id, result);
    }

    /// The staged value, or `None` if the match has no edit.
    pub fn get(&self, match_id: MatchId) -> Option<Option<Outcome>> {
        self.edits.get(&match_id).copied()
    }

    pub fn contains(&self, match_id: MatchId) -> bool {
        self.edits.contains_key(&match_id)
    }

    /// Remove one edit so the match falls back to its persisted result. Returns whether one existed.
    pub fn discard(&mut self, match_id: MatchId) -> bool {
        self.edits.remove(&match_id).is_some()
    }

    /// Remove all edits. Only called after a successful remote commit.
    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn has_pending(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// All edits as a commit batch, ordered by match id.
    pub fn edits(&self) -> Vec<StagedEdit> {
        let mut batch: Vec<StagedEdit> = self
            .edits
            .iter()
            .map(|(&match_id, &result)| StagedEdit { match_id, result })
            .collect();
        batch.sort_by_key(|e| e.match_id);
        batch
    }
}
