//! Registration gate: whether the caller may register for a tournament.

use crate::models::{ServiceError, Session, Stage, Tournament, TournamentId};
use crate::remote::TournamentService;
use serde::Serialize;
use thiserror::Error;

/// The first condition that vetoes a registration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RegistrationVeto {
    #[error("log in to register")]
    NotAuthenticated,
    #[error("registration is not open (tournament is {stage})")]
    NotOpen { stage: Stage },
    #[error("the tournament is full ({capacity} players)")]
    Full { capacity: u32 },
    #[error("already registered")]
    AlreadyRegistered,
}

/// Error from [`register`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Veto(#[from] RegistrationVeto),
    #[error(transparent)]
    Remote(#[from] ServiceError),
}

/// Check every registration condition; `None` means registration is allowed.
pub fn registration_veto(
    tournament: &Tournament,
    is_authenticated: bool,
    is_already_registered: bool,
) -> Option<RegistrationVeto> {
    if !is_authenticated {
        return Some(RegistrationVeto::NotAuthenticated);
    }
    if tournament.stage != Stage::Registration {
        return Some(RegistrationVeto::NotOpen {
            stage: tournament.stage,
        });
    }
    if let Some(capacity) = tournament.max_players.filter(|_| tournament.is_full()) {
        return Some(RegistrationVeto::Full { capacity });
    }
    if is_already_registered {
        return Some(RegistrationVeto::AlreadyRegistered);
    }
    None
}

/// True iff authenticated, registration open, below capacity, and not yet registered.
pub fn can_register(
    tournament: &Tournament,
    is_authenticated: bool,
    is_already_registered: bool,
) -> bool {
    registration_veto(tournament, is_authenticated, is_already_registered).is_none()
}

/// Outcome of [`check_registration`].
#[derive(Clone, Debug, Serialize)]
pub struct RegistrationDecision {
    pub tournament_id: TournamentId,
    pub already_registered: bool,
    pub veto: Option<RegistrationVeto>,
}

impl RegistrationDecision {
    pub fn allowed(&self) -> bool {
        self.veto.is_none()
    }
}

/// Fetch the tournament and (for an authenticated session) the registered flag, then decide.
pub async fn check_registration<S: TournamentService>(
    service: &S,
    session: &Session,
    id: TournamentId,
) -> Result<RegistrationDecision, ServiceError> {
    let tournament = service.fetch_tournament(id).await?;
    let already_registered = if session.is_authenticated() {
        service.is_registered(session, id).await?
    } else {
        false
    };
    Ok(RegistrationDecision {
        tournament_id: id,
        already_registered,
        veto: registration_veto(&tournament, session.is_authenticated(), already_registered),
    })
}

/// Register the session's user. A vetoed registration never reaches the register endpoint.
pub async fn register<S: TournamentService>(
    service: &S,
    session: &Session,
    id: TournamentId,
) -> Result<(), RegistrationError> {
    let decision = check_registration(service, session, id).await?;
    if let Some(veto) = decision.veto {
        log::debug!("Registration for tournament {} vetoed: {}", id, veto);
        return Err(veto.into());
    }
    service.register(session, id).await?;
    log::info!("Registered for tournament {}", id);
    Ok(())
}
