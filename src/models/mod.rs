//! Data structures: matches, tournament snapshot, session, and errors.

mod error;
mod game;
mod player;
mod session;
mod tournament;

pub use error::{Precondition, ProgressionError, ServiceError};
pub use game::{Match, MatchId, Outcome, StagedEdit};
pub use player::{Player, PlayerId};
pub use session::{AuthGrant, Credentials, Role, Session};
pub use tournament::{Stage, Tournament, TournamentError, TournamentId};
