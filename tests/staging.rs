//! Integration tests for the staging store and the round gate.

use chess_union_admin::{round_gate, Match, Outcome, ResultStagingStore, StagedEdit};

fn round() -> Vec<Match> {
    vec![
        Match::new(1, 1, "Anna", "Boris"),
        Match::new(2, 1, "Carl", "Dana"),
        Match::new(3, 1, "Egor", "Fiona").with_result(Outcome::WhiteWin),
    ]
}

#[test]
fn get_distinguishes_reset_from_not_staged() {
    let mut store = ResultStagingStore::new();
    assert_eq!(store.get(1), None);
    store.stage(1, None);
    assert_eq!(store.get(1), Some(None));
    store.stage(1, Some(Outcome::Draw));
    assert_eq!(store.get(1), Some(Some(Outcome::Draw)));
    assert!(store.has_pending());
}

#[test]
fn discard_and_clear_remove_entries() {
    let mut store = ResultStagingStore::new();
    store.stage(1, Some(Outcome::WhiteWin));
    store.stage(2, Some(Outcome::BlackWin));
    assert!(store.discard(1));
    assert!(!store.discard(1));
    assert_eq!(store.len(), 1);
    store.clear();
    assert!(!store.has_pending());
    assert!(store.is_empty());
}

#[test]
fn edits_are_a_sorted_batch_with_last_value_per_match() {
    let mut store = ResultStagingStore::new();
    store.stage(9, Some(Outcome::Draw));
    store.stage(2, Some(Outcome::WhiteWin));
    store.stage(2, None);
    assert_eq!(
        store.edits(),
        vec![
            StagedEdit { match_id: 2, result: None },
            StagedEdit { match_id: 9, result: Some(Outcome::Draw) },
        ]
    );
}

#[test]
fn round_with_undecided_matches_cannot_advance() {
    let matches = round();
    let mut store = ResultStagingStore::new();
    assert!(!round_gate::can_advance(&matches, &store));
    assert_eq!(round_gate::undecided_count(&matches, &store), 2);

    store.stage(1, Some(Outcome::Draw));
    assert!(!round_gate::can_advance(&matches, &store));
    store.stage(2, Some(Outcome::BlackWin));
    assert!(round_gate::can_advance(&matches, &store));
}

#[test]
fn staged_reset_overrides_persisted_result() {
    let matches = round();
    let mut store = ResultStagingStore::new();
    store.stage(1, Some(Outcome::Draw));
    store.stage(2, Some(Outcome::Draw));
    assert!(round_gate::can_advance(&matches, &store));

    store.stage(3, None);
    assert_eq!(round_gate::effective_result(&matches[2], &store), None);
    assert!(!round_gate::can_advance(&matches, &store));

    store.discard(3);
    assert_eq!(
        round_gate::effective_result(&matches[2], &store),
        Some(Outcome::WhiteWin)
    );
}

#[test]
fn empty_round_can_advance() {
    assert!(round_gate::can_advance(&[], &ResultStagingStore::new()));
}

#[test]
fn committed_results_are_read_only_unless_staged() {
    let matches = round();
    let mut store = ResultStagingStore::new();
    assert!(round_gate::can_edit_match(&matches[0], &store));
    assert!(!round_gate::can_edit_match(&matches[2], &store));
    store.stage(3, Some(Outcome::Draw));
    assert!(round_gate::can_edit_match(&matches[2], &store));
}
