//! In-process system of record: scripted rounds, failure injection and a call log.
//!
//! Pairings are not computed here. The matches each round will contain are scheduled up front
//! with [`MemoryTournamentService::schedule_round`]; generating a round that was never
//! scheduled yields an empty round.

use crate::models::{
    AuthGrant, Credentials, Match, Player, Role, ServiceError, Session, StagedEdit, Stage,
    Tournament, TournamentId,
};
use crate::remote::TournamentService;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Remote operation, for failure injection and the call log.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RemoteCall {
    FetchTournament,
    FetchMatches,
    SetResults,
    CreateNextRound,
    RollbackRound,
    Register,
    IsRegistered,
    Login,
}

#[derive(Debug)]
struct Account {
    password: String,
    role: Role,
    full_name: String,
}

#[derive(Debug, Default)]
struct Backend {
    tournaments: HashMap<TournamentId, Tournament>,
    /// Matches of rounds that have been generated.
    matches: HashMap<TournamentId, Vec<Match>>,
    /// Matches to hand out when a round is generated.
    scheduled: HashMap<(TournamentId, u32), Vec<Match>>,
    accounts: HashMap<String, Account>,
    /// (tournament, login) pairs.
    registrations: HashSet<(TournamentId, String)>,
    failures: HashMap<RemoteCall, usize>,
    calls: Vec<RemoteCall>,
    committed: Vec<Vec<StagedEdit>>,
}

impl Backend {
    /// Log the call and consume an injected failure for it, if any.
    fn enter(&mut self, call: RemoteCall) -> Result<(), ServiceError> {
        self.calls.push(call);
        match self.failures.get_mut(&call) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(ServiceError::Transport(format!("injected failure for {call:?}")))
            }
            _ => Ok(()),
        }
    }

    fn tournament_mut(&mut self, id: TournamentId) -> Result<&mut Tournament, ServiceError> {
        self.tournaments.get_mut(&id).ok_or_else(|| not_found(id))
    }

    fn login_of(&self, session: &Session) -> Result<String, ServiceError> {
        session
            .bearer_token()
            .and_then(|t| t.strip_prefix("token-"))
            .filter(|login| self.accounts.contains_key(*login))
            .map(str::to_string)
            .ok_or_else(|| status(401, "not authenticated"))
    }

    fn require_admin(&self, session: &Session) -> Result<(), ServiceError> {
        let login = self.login_of(session)?;
        match self.accounts.get(&login).map(|a| a.role) {
            Some(Role::Admin) => Ok(()),
            _ => Err(status(403, "administrator role required")),
        }
    }
}

fn status(status: u16, message: &str) -> ServiceError {
    ServiceError::Status {
        status,
        message: message.to_string(),
    }
}

fn not_found(id: TournamentId) -> ServiceError {
    status(404, &format!("tournament {id} not found"))
}

/// [`TournamentService`] backed by process memory. Clones share the same backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryTournamentService {
    inner: Arc<Mutex<Backend>>,
}

impl MemoryTournamentService {
    pub fn new() -> Self {
        Self::default()
    }

    fn backend(&self) -> MutexGuard<'_, Backend> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert_tournament(&self, tournament: Tournament) {
        self.backend().tournaments.insert(tournament.id, tournament);
    }

    /// Matches that already exist remotely (e.g. a round generated earlier).
    pub fn insert_matches(&self, id: TournamentId, matches: Vec<Match>) {
        self.backend().matches.entry(id).or_default().extend(matches);
    }

    /// Matches handed out when `round` is generated.
    pub fn schedule_round(&self, id: TournamentId, round: u32, matches: Vec<Match>) {
        self.backend().scheduled.insert((id, round), matches);
    }

    pub fn add_account(&self, login: &str, password: &str, role: Role) {
        self.backend().accounts.insert(
            login.to_string(),
            Account {
                password: password.to_string(),
                role,
                full_name: login.to_string(),
            },
        );
    }

    /// Make the next `times` calls of `call` fail with a transport error.
    pub fn fail_next(&self, call: RemoteCall, times: usize) {
        self.backend().failures.insert(call, times);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.backend().calls.clone()
    }

    pub fn call_count(&self, call: RemoteCall) -> usize {
        self.backend().calls.iter().filter(|&&c| c == call).count()
    }

    /// Every successfully committed result batch, in order.
    pub fn committed_batches(&self) -> Vec<Vec<StagedEdit>> {
        self.backend().committed.clone()
    }

    pub fn tournament(&self, id: TournamentId) -> Option<Tournament> {
        self.backend().tournaments.get(&id).cloned()
    }

    pub fn round_matches(&self, id: TournamentId, round: u32) -> Vec<Match> {
        self.backend()
            .matches
            .get(&id)
            .map(|ms| ms.iter().filter(|m| m.round_number == round).cloned().collect())
            .unwrap_or_default()
    }
}

impl TournamentService for MemoryTournamentService {
    async fn fetch_tournament(&self, id: TournamentId) -> Result<Tournament, ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::FetchTournament)?;
        backend.tournaments.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn fetch_matches(
        &self,
        id: TournamentId,
        round: u32,
    ) -> Result<Vec<Match>, ServiceError> {
        self.backend().enter(RemoteCall::FetchMatches)?;
        Ok(self.round_matches(id, round))
    }

    async fn set_results(
        &self,
        session: &Session,
        edits: &[StagedEdit],
    ) -> Result<(), ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::SetResults)?;
        backend.require_admin(session)?;
        let known: HashSet<_> = backend
            .matches
            .values()
            .flatten()
            .map(|m| m.id)
            .collect();
        if let Some(missing) = edits.iter().find(|e| !known.contains(&e.match_id)) {
            return Err(status(404, &format!("match {} not found", missing.match_id)));
        }
        for m in backend.matches.values_mut().flatten() {
            if let Some(edit) = edits.iter().find(|e| e.match_id == m.id) {
                m.persisted_result = edit.result;
            }
        }
        backend.committed.push(edits.to_vec());
        Ok(())
    }

    async fn create_next_round(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<u32, ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::CreateNextRound)?;
        backend.require_admin(session)?;
        let tournament = backend.tournament_mut(id)?;
        if tournament.is_final_round() {
            tournament
                .finish()
                .map_err(|e| status(409, &e.to_string()))?;
            return Ok(tournament.current_round);
        }
        if tournament.stage == Stage::Registration && !tournament.has_enough_players() {
            return Err(status(409, "not enough players"));
        }
        let transition = if tournament.current_round == 0 {
            tournament.begin_playing()
        } else {
            tournament.advance_round()
        };
        transition.map_err(|e| status(409, &e.to_string()))?;
        let round = tournament.current_round;
        let generated = backend.scheduled.remove(&(id, round)).unwrap_or_default();
        backend.matches.entry(id).or_default().extend(generated);
        Ok(round)
    }

    async fn rollback_round(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<(), ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::RollbackRound)?;
        backend.require_admin(session)?;
        let tournament = backend.tournament_mut(id)?;
        let discarded = tournament.current_round;
        tournament
            .roll_back_round()
            .map_err(|e| status(409, &e.to_string()))?;
        let reopened = tournament.current_round;
        if let Some(matches) = backend.matches.get_mut(&id) {
            matches.retain(|m| m.round_number != discarded);
            for m in matches.iter_mut().filter(|m| m.round_number == reopened) {
                m.persisted_result = None;
            }
        }
        Ok(())
    }

    async fn register(&self, session: &Session, id: TournamentId) -> Result<(), ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::Register)?;
        let login = backend.login_of(session)?;
        if backend.registrations.contains(&(id, login.clone())) {
            return Err(status(409, "already registered"));
        }
        let full_name = backend
            .accounts
            .get(&login)
            .map(|a| a.full_name.clone())
            .unwrap_or_default();
        let tournament = backend.tournament_mut(id)?;
        if tournament.stage != Stage::Registration {
            return Err(status(409, "registration is closed"));
        }
        if tournament.is_full() {
            return Err(status(409, "tournament is full"));
        }
        let player_id = tournament.players.len() as u32 + 1;
        tournament
            .players
            .push(Player::new(player_id, full_name, 0.0));
        backend.registrations.insert((id, login));
        Ok(())
    }

    async fn is_registered(
        &self,
        session: &Session,
        id: TournamentId,
    ) -> Result<bool, ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::IsRegistered)?;
        let login = backend.login_of(session)?;
        Ok(backend.registrations.contains(&(id, login)))
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ServiceError> {
        let mut backend = self.backend();
        backend.enter(RemoteCall::Login)?;
        let account = backend
            .accounts
            .get(&credentials.login)
            .filter(|a| a.password == credentials.password)
            .ok_or_else(|| status(401, "bad credentials"))?;
        Ok(AuthGrant {
            token: format!("token-{}", credentials.login),
            role: account.role,
        })
    }
}
