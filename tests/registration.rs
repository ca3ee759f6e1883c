//! Integration tests for the registration gate and the register flow.

use chess_union_admin::{
    can_register, check_registration, register, registration_veto, AuthGrant, Credentials,
    MemoryTournamentService, Player, RegistrationError, RegistrationVeto, RemoteCall, Role,
    Session, Stage, Tournament, TournamentService,
};

fn tournament_with_players(n: u32, max_players: Option<u32>) -> Tournament {
    let players = (1..=n).map(|i| Player::new(i, format!("P{i}"), 1400.0)).collect();
    Tournament::new(1, "Club Swiss", 5)
        .with_capacity(Some(2), max_players)
        .with_players(players)
}

fn user_session(login: &str) -> Session {
    Session::from_grant(AuthGrant {
        token: format!("token-{login}"),
        role: Role::User,
    })
}

#[test]
fn full_tournament_vetoes_registration() {
    let t = tournament_with_players(8, Some(8));
    assert_eq!(t.stage, Stage::Registration);
    assert!(!can_register(&t, true, false));
    assert_eq!(
        registration_veto(&t, true, false),
        Some(RegistrationVeto::Full { capacity: 8 })
    );
}

#[test]
fn open_tournament_below_capacity_allows_registration() {
    let t = tournament_with_players(7, Some(8));
    assert!(can_register(&t, true, false));
}

#[test]
fn no_maximum_means_never_full() {
    let t = tournament_with_players(200, None);
    assert!(can_register(&t, true, false));
}

#[test]
fn each_condition_vetoes_on_its_own() {
    let t = tournament_with_players(3, Some(8));
    assert_eq!(
        registration_veto(&t, false, false),
        Some(RegistrationVeto::NotAuthenticated)
    );
    assert_eq!(
        registration_veto(&t, true, true),
        Some(RegistrationVeto::AlreadyRegistered)
    );

    let mut playing = t.clone();
    playing.begin_playing().unwrap();
    assert_eq!(
        registration_veto(&playing, true, false),
        Some(RegistrationVeto::NotOpen { stage: Stage::Playing })
    );
}

fn service_with(tournament: Tournament) -> MemoryTournamentService {
    let service = MemoryTournamentService::new();
    service.insert_tournament(tournament);
    service.add_account("maria", "secret", Role::User);
    service
}

#[tokio::test]
async fn register_then_already_registered() {
    let service = service_with(tournament_with_players(2, Some(8)));
    let session = user_session("maria");

    register(&service, &session, 1).await.unwrap();
    assert_eq!(service.tournament(1).unwrap().players.len(), 3);

    let decision = check_registration(&service, &session, 1).await.unwrap();
    assert!(decision.already_registered);
    assert_eq!(decision.veto, Some(RegistrationVeto::AlreadyRegistered));
    assert!(!decision.allowed());

    let err = register(&service, &session, 1).await.unwrap_err();
    assert_eq!(err, RegistrationError::Veto(RegistrationVeto::AlreadyRegistered));
    assert_eq!(service.call_count(RemoteCall::Register), 1);
}

#[tokio::test]
async fn vetoed_registration_never_calls_register() {
    let service = service_with(tournament_with_players(8, Some(8)));
    let err = register(&service, &user_session("maria"), 1).await.unwrap_err();
    assert_eq!(err, RegistrationError::Veto(RegistrationVeto::Full { capacity: 8 }));
    assert_eq!(service.call_count(RemoteCall::Register), 0);
}

#[tokio::test]
async fn anonymous_caller_is_not_checked_remotely() {
    let service = service_with(tournament_with_players(2, Some(8)));
    let decision = check_registration(&service, &Session::anonymous(), 1)
        .await
        .unwrap();
    assert_eq!(decision.veto, Some(RegistrationVeto::NotAuthenticated));
    assert_eq!(service.call_count(RemoteCall::IsRegistered), 0);
}

#[tokio::test]
async fn remote_failure_is_surfaced() {
    let service = service_with(tournament_with_players(2, Some(8)));
    service.fail_next(RemoteCall::Register, 1);
    let err = register(&service, &user_session("maria"), 1).await.unwrap_err();
    assert!(matches!(err, RegistrationError::Remote(_)));
    assert_eq!(service.tournament(1).unwrap().players.len(), 2);
}

#[tokio::test]
async fn login_and_logout_lifecycle() {
    let service = service_with(tournament_with_players(2, Some(8)));
    let grant = service
        .login(&Credentials {
            login: "maria".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    let mut session = Session::from_grant(grant);
    assert!(session.is_authenticated());
    assert!(!session.is_admin());
    assert!(check_registration(&service, &session, 1).await.unwrap().allowed());

    session.logout();
    assert!(!session.is_authenticated());
    assert_eq!(session.bearer_token(), None);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let service = service_with(tournament_with_players(2, Some(8)));
    let result = service
        .login(&Credentials {
            login: "maria".to_string(),
            password: "nope".to_string(),
        })
        .await;
    assert!(result.is_err());
}
