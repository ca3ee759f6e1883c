//! Integration tests for tournament stage and round transitions.

use chess_union_admin::{Stage, Tournament, TournamentError};

#[test]
fn full_lifecycle_keeps_round_and_stage_consistent() {
    let mut t = Tournament::new(1, "Open", 2);
    assert_eq!((t.stage, t.current_round), (Stage::Registration, 0));

    t.begin_playing().unwrap();
    assert_eq!((t.stage, t.current_round), (Stage::Playing, 1));

    t.advance_round().unwrap();
    assert_eq!((t.stage, t.current_round), (Stage::Playing, 2));
    assert!(t.is_final_round());

    t.finish().unwrap();
    assert_eq!((t.stage, t.current_round), (Stage::Finished, 2));
}

#[test]
fn cannot_advance_past_amount_of_rounds() {
    let mut t = Tournament::new(1, "Open", 1);
    t.begin_playing().unwrap();
    assert_eq!(t.advance_round(), Err(TournamentError::RoundLimitReached(1)));
    assert_eq!(t.current_round, 1);
}

#[test]
fn finished_tournament_cannot_resume_or_roll_back() {
    let mut t = Tournament::new(1, "Open", 1);
    t.begin_playing().unwrap();
    t.finish().unwrap();
    assert!(matches!(
        t.advance_round(),
        Err(TournamentError::InvalidStage { stage: Stage::Finished, .. })
    ));
    assert!(t.roll_back_round().is_err());
    assert!(t.begin_playing().is_err());
    assert_eq!(t.stage, Stage::Finished);
}

#[test]
fn rollback_decrements_and_reopens_registration_at_zero() {
    let mut t = Tournament::new(1, "Open", 3);
    t.begin_playing().unwrap();
    t.advance_round().unwrap();

    t.roll_back_round().unwrap();
    assert_eq!((t.stage, t.current_round), (Stage::Playing, 1));

    t.roll_back_round().unwrap();
    assert_eq!((t.stage, t.current_round), (Stage::Registration, 0));

    assert!(t.roll_back_round().is_err());
}

#[test]
fn finish_requires_final_round() {
    let mut t = Tournament::new(1, "Open", 3);
    t.begin_playing().unwrap();
    assert_eq!(
        t.finish(),
        Err(TournamentError::NotFinalRound { current: 1, total: 3 })
    );
}

#[test]
fn announced_and_cancelled_tournaments_cannot_start() {
    for stage in [Stage::Announced, Stage::Cancelled] {
        let mut t = Tournament::new(1, "Open", 3);
        t.stage = stage;
        assert!(t.begin_playing().is_err());
    }
}
