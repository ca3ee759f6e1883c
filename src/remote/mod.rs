//! Remote tournament/match service: the system of record behind the console.

mod http;
mod memory;

pub use http::HttpTournamentService;
pub use memory::{MemoryTournamentService, RemoteCall};

use crate::models::{
    AuthGrant, Credentials, Match, ServiceError, Session, StagedEdit, Tournament, TournamentId,
};

/// Operations consumed from the tournament/match service.
///
/// Calls that need authorization take the caller's [`Session`] explicitly. Every call either
/// succeeds as a whole or returns a [`ServiceError`]; no partial success is assumed.
#[allow(async_fn_in_trait)]
pub trait TournamentService {
    /// Fetch the tournament snapshot.
    async fn fetch_tournament(&self, id: TournamentId) -> Result<Tournament, ServiceError>;

    /// Fetch the matches of one round.
    async fn fetch_matches(
        &self,
        id: TournamentId,
        round: u32,
    ) -> Result<Vec<Match>, ServiceError>;

    /// Overwrite the results of all listed matches in one batch (last writer wins).
    async fn set_results(&self, session: &Session, edits: &[StagedEdit])
        -> Result<(), ServiceError>;

    /// Generate the next round and return its number. When the final round is already
    /// active this closes the tournament instead.
    async fn create_next_round(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<u32, ServiceError>;

    /// Discard the active round's matches and results.
    async fn rollback_round(&self, session: &Session, id: TournamentId)
        -> Result<(), ServiceError>;

    /// Register the session's user for the tournament.
    async fn register(&self, session: &Session, id: TournamentId) -> Result<(), ServiceError>;

    /// Whether the session's user is already registered.
    async fn is_registered(&self, session: &Session, id: TournamentId)
        -> Result<bool, ServiceError>;

    /// Exchange credentials for a token.
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ServiceError>;
}
