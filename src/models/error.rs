//! Error types shared by the gates, the controller and the remote service.

use crate::models::game::MatchId;
use crate::models::tournament::{Stage, TournamentError};
use thiserror::Error;

/// Failure reported by (or while reaching) the remote tournament/match service.
///
/// Never mutates local state on its own; every operation that sees one may be retried.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ServiceError {
    /// Connection, timeout or other transport failure.
    #[error("tournament service unreachable: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("tournament service responded {status}: {message}")]
    Status { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("unexpected response from tournament service: {0}")]
    Decode(String),
}

/// An operation was invoked while its guard was false. Nothing was sent remotely.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Precondition {
    #[error("an administrator session is required")]
    NotAdministrator,
    #[error("tournament is {actual}, expected {expected}")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("the draw has already produced round {0}")]
    DrawAlreadyStarted(u32),
    #[error("{registered} players registered, at least {required} required")]
    NotEnoughPlayers { required: u32, registered: usize },
    #[error("{undecided} match(es) in the active round have no result")]
    RoundIncomplete { undecided: usize },
    #[error("no staged results to commit")]
    NoPendingEdits,
    #[error("round {0} is the final round")]
    FinalRoundReached(u32),
    #[error("round {current} of {total} is not the final round")]
    NotFinalRound { current: u32, total: u32 },
    #[error("no round is active")]
    NoActiveRound,
    #[error("matches of round {0} are not loaded; refresh first")]
    RoundNotLoaded(u32),
    #[error("match {0} is not part of the active round")]
    MatchNotInActiveRound(MatchId),
    #[error("match {0} already has a committed result")]
    MatchLocked(MatchId),
    #[error(transparent)]
    Transition(#[from] TournamentError),
}

/// Error from a ProgressionController operation.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ProgressionError {
    #[error(transparent)]
    Precondition(#[from] Precondition),
    #[error(transparent)]
    Remote(#[from] ServiceError),
}

impl From<TournamentError> for ProgressionError {
    fn from(e: TournamentError) -> Self {
        ProgressionError::Precondition(Precondition::Transition(e))
    }
}
