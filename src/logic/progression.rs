//! Round progression: commit staged results, advance, finish and roll back rounds.
//!
//! The controller owns the staging store and the snapshot of the active round. Mutating
//! operations take `&mut self`, so they run strictly one after another; each one fully
//! completes (or fails) its remote steps before the next can start.

use crate::logic::freshness::{RequestSequencer, RequestTicket};
use crate::logic::round_gate;
use crate::logic::staging::ResultStagingStore;
use crate::models::{
    Match, MatchId, Outcome, Precondition, ProgressionError, ServiceError, Session, Stage,
    Tournament, TournamentId,
};
use crate::remote::TournamentService;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tournament snapshot plus the matches of its active round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSnapshot {
    pub tournament: Tournament,
    pub matches: Vec<Match>,
}

/// Fetch the snapshot and, when a round is active, its matches.
pub async fn fetch_round_snapshot<S: TournamentService>(
    service: &S,
    id: TournamentId,
) -> Result<RoundSnapshot, ServiceError> {
    let tournament = service.fetch_tournament(id).await?;
    let matches = if tournament.current_round > 0 {
        service.fetch_matches(id, tournament.current_round).await?
    } else {
        Vec::new()
    };
    Ok(RoundSnapshot {
        tournament,
        matches,
    })
}

/// A pending reload started with [`ProgressionController::begin_refresh`].
#[derive(Clone, Copy, Debug)]
pub struct RefreshRequest {
    pub ticket: RequestTicket,
    pub tournament_id: TournamentId,
}

/// One row of the console: the match with what the administrator sees and may do.
#[derive(Clone, Debug, Serialize)]
pub struct MatchRow {
    #[serde(flatten)]
    pub game: Match,
    pub effective_result: Option<Outcome>,
    pub staged: bool,
    pub editable: bool,
}

/// Serializable state of the console.
#[derive(Clone, Debug, Serialize)]
pub struct ConsoleView {
    pub tournament: Tournament,
    pub matches: Vec<MatchRow>,
    pub pending_edits: usize,
    pub undecided: usize,
    pub can_start_draw: bool,
    pub can_commit: bool,
    pub can_advance: bool,
    pub can_finish: bool,
    pub can_roll_back: bool,
    pub round_loaded: bool,
    pub synced_at: DateTime<Utc>,
}

/// Administrator's controller for one tournament.
pub struct ProgressionController<S> {
    service: S,
    session: Session,
    tournament: Tournament,
    matches: Vec<Match>,
    /// False while the active round's matches could not be fetched.
    round_loaded: bool,
    staging: ResultStagingStore,
    requests: RequestSequencer,
    synced_at: DateTime<Utc>,
}

impl<S: TournamentService> ProgressionController<S> {
    /// Load the tournament and its active round. Requires an administrator session.
    pub async fn open(
        service: S,
        session: Session,
        tournament_id: TournamentId,
    ) -> Result<Self, ProgressionError> {
        if !session.is_admin() {
            return Err(Precondition::NotAdministrator.into());
        }
        let snapshot = fetch_round_snapshot(&service, tournament_id).await?;
        Self::from_snapshot(service, session, snapshot)
    }

    /// Build a controller over an already-fetched snapshot. Requires an administrator session.
    pub fn from_snapshot(
        service: S,
        session: Session,
        snapshot: RoundSnapshot,
    ) -> Result<Self, ProgressionError> {
        if !session.is_admin() {
            return Err(Precondition::NotAdministrator.into());
        }
        log::debug!(
            "Opened tournament {} at round {} ({} matches)",
            snapshot.tournament.id,
            snapshot.tournament.current_round,
            snapshot.matches.len()
        );
        Ok(Self {
            service,
            session,
            tournament: snapshot.tournament,
            matches: snapshot.matches,
            round_loaded: true,
            staging: ResultStagingStore::new(),
            requests: RequestSequencer::new(),
            synced_at: Utc::now(),
        })
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    /// Matches of the active round.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Whether the matches of the active round are known.
    pub fn round_loaded(&self) -> bool {
        self.round_loaded
    }

    pub fn staging(&self) -> &ResultStagingStore {
        &self.staging
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn active_match(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    /// Effective result of a match in the active round (`None` if the match is unknown).
    pub fn effective_result(&self, match_id: MatchId) -> Option<Option<Outcome>> {
        self.active_match(match_id)
            .map(|m| round_gate::effective_result(m, &self.staging))
    }

    /// Stage a result (or an explicit reset with `None`) for a match of the active round.
    pub fn stage_result(
        &mut self,
        match_id: MatchId,
        result: Option<Outcome>,
    ) -> Result<(), ProgressionError> {
        self.require_stage(Stage::Playing)?;
        let m = self
            .active_match(match_id)
            .ok_or(Precondition::MatchNotInActiveRound(match_id))?;
        if !round_gate::can_edit_match(m, &self.staging) {
            return Err(Precondition::MatchLocked(match_id).into());
        }
        self.staging.stage(match_id, result);
        Ok(())
    }

    /// Drop the staged edit for a match so it shows its persisted result again.
    pub fn discard_edit(&mut self, match_id: MatchId) -> bool {
        self.staging.discard(match_id)
    }

    pub fn can_start_draw(&self) -> bool {
        self.check_start_draw().is_ok()
    }

    pub fn can_commit(&self) -> bool {
        self.staging.has_pending()
    }

    pub fn can_advance(&self) -> bool {
        self.check_advance().is_ok()
    }

    pub fn can_finish(&self) -> bool {
        self.check_finish().is_ok()
    }

    pub fn can_roll_back(&self) -> bool {
        self.check_rollback().is_ok()
    }

    fn require_stage(&self, expected: Stage) -> Result<(), Precondition> {
        if self.tournament.stage != expected {
            return Err(Precondition::WrongStage {
                expected,
                actual: self.tournament.stage,
            });
        }
        Ok(())
    }

    fn require_round_complete(&self) -> Result<(), Precondition> {
        if self.tournament.current_round == 0 {
            return Err(Precondition::NoActiveRound);
        }
        if !self.round_loaded {
            return Err(Precondition::RoundNotLoaded(self.tournament.current_round));
        }
        let undecided = round_gate::undecided_count(&self.matches, &self.staging);
        if undecided > 0 {
            return Err(Precondition::RoundIncomplete { undecided });
        }
        Ok(())
    }

    fn check_start_draw(&self) -> Result<(), Precondition> {
        self.require_stage(Stage::Registration)?;
        if self.tournament.current_round != 0 || !self.matches.is_empty() {
            return Err(Precondition::DrawAlreadyStarted(self.tournament.current_round));
        }
        if let Some(required) = self.tournament.min_players {
            if !self.tournament.has_enough_players() {
                return Err(Precondition::NotEnoughPlayers {
                    required,
                    registered: self.tournament.players.len(),
                });
            }
        }
        Ok(())
    }

    fn check_advance(&self) -> Result<(), Precondition> {
        self.require_stage(Stage::Playing)?;
        if self.tournament.current_round >= self.tournament.amount_of_rounds {
            return Err(Precondition::FinalRoundReached(self.tournament.current_round));
        }
        self.require_round_complete()
    }

    fn check_finish(&self) -> Result<(), Precondition> {
        self.require_stage(Stage::Playing)?;
        if self.tournament.current_round != self.tournament.amount_of_rounds {
            return Err(Precondition::NotFinalRound {
                current: self.tournament.current_round,
                total: self.tournament.amount_of_rounds,
            });
        }
        self.require_round_complete()
    }

    fn check_rollback(&self) -> Result<(), Precondition> {
        self.require_stage(Stage::Playing)?;
        if self.tournament.current_round == 0 {
            return Err(Precondition::NoActiveRound);
        }
        Ok(())
    }

    /// Generate round 1 and move the tournament from Registration to Playing.
    pub async fn start_draw(&mut self) -> Result<(), ProgressionError> {
        self.check_start_draw()?;
        let round = self.generate_round().await?;
        self.tournament.begin_playing()?;
        if round != self.tournament.current_round {
            log::warn!(
                "Tournament {}: service generated round {} as the first round",
                self.tournament.id,
                round
            );
        }
        log::info!("Tournament {}: draw started, round 1 generated", self.tournament.id);
        self.reload_active_round().await;
        Ok(())
    }

    /// Send every staged edit as one batch; clear the store only if the batch was accepted.
    pub async fn commit_staged(&mut self) -> Result<(), ProgressionError> {
        if !self.staging.has_pending() {
            return Err(Precondition::NoPendingEdits.into());
        }
        self.requests.issue();
        let batch = self.staging.edits();
        if let Err(e) = self.service.set_results(&self.session, &batch).await {
            log::warn!(
                "Tournament {}: commit of {} result(s) failed, edits kept: {}",
                self.tournament.id,
                batch.len(),
                e
            );
            return Err(e.into());
        }
        for edit in &batch {
            if let Some(m) = self.matches.iter_mut().find(|m| m.id == edit.match_id) {
                m.persisted_result = edit.result;
            }
        }
        self.staging.clear();
        self.synced_at = Utc::now();
        log::info!(
            "Tournament {}: committed {} result(s)",
            self.tournament.id,
            batch.len()
        );
        Ok(())
    }

    /// Commit pending edits, then generate the next round.
    ///
    /// If generation fails after the commit succeeded, the committed results stay saved and the
    /// call can simply be repeated; the commit step is then skipped because nothing is staged.
    pub async fn advance_round(&mut self) -> Result<(), ProgressionError> {
        self.check_advance()?;
        self.commit_if_pending().await?;
        let round = self.generate_round().await?;
        self.tournament.advance_round()?;
        if round != self.tournament.current_round {
            log::warn!(
                "Tournament {}: expected round {}, service reported {}",
                self.tournament.id,
                self.tournament.current_round,
                round
            );
        }
        log::info!(
            "Tournament {}: advanced to round {} of {}",
            self.tournament.id,
            self.tournament.current_round,
            self.tournament.amount_of_rounds
        );
        self.reload_active_round().await;
        Ok(())
    }

    /// Commit pending edits of the final round, then close the tournament.
    pub async fn finish(&mut self) -> Result<(), ProgressionError> {
        self.check_finish()?;
        self.commit_if_pending().await?;
        self.generate_round().await?;
        self.tournament.finish()?;
        log::info!(
            "Tournament {}: finished after {} round(s)",
            self.tournament.id,
            self.tournament.current_round
        );
        Ok(())
    }

    /// Discard the active round remotely and step back one round.
    ///
    /// Destroys the round's matches and results. Staged edits for those matches are dropped;
    /// rolling back round 1 reopens registration.
    pub async fn rollback(&mut self) -> Result<(), ProgressionError> {
        self.check_rollback()?;
        self.requests.issue();
        let discarded = self.tournament.current_round;
        if let Err(e) = self
            .service
            .rollback_round(&self.session, self.tournament.id)
            .await
        {
            log::warn!(
                "Tournament {}: rollback of round {} failed: {}",
                self.tournament.id,
                discarded,
                e
            );
            return Err(e.into());
        }
        self.tournament.roll_back_round()?;
        for m in std::mem::take(&mut self.matches) {
            self.staging.discard(m.id);
        }
        self.synced_at = Utc::now();
        log::info!(
            "Tournament {}: rolled back round {} ({})",
            self.tournament.id,
            discarded,
            self.tournament.stage
        );
        if self.tournament.current_round > 0 {
            self.reload_active_round().await;
        }
        Ok(())
    }

    /// Start a reload. Any later mutating operation or reload makes this one stale.
    pub fn begin_refresh(&mut self) -> RefreshRequest {
        RefreshRequest {
            ticket: self.requests.issue(),
            tournament_id: self.tournament.id,
        }
    }

    /// Apply a reload result if its ticket is still current. Returns whether it was applied.
    /// Staged edits are kept for matches still in the active round and dropped for the rest.
    pub fn apply_refresh(&mut self, ticket: RequestTicket, snapshot: RoundSnapshot) -> bool {
        if !self.requests.is_current(ticket) {
            log::debug!(
                "Tournament {}: ignoring superseded reload",
                self.tournament.id
            );
            return false;
        }
        if snapshot.tournament.current_round != self.tournament.current_round {
            log::warn!(
                "Tournament {}: round changed remotely from {} to {}",
                self.tournament.id,
                self.tournament.current_round,
                snapshot.tournament.current_round
            );
        }
        for edit in self.staging.edits() {
            if !snapshot.matches.iter().any(|m| m.id == edit.match_id) {
                log::info!(
                    "Tournament {}: dropping staged result for match {}, no longer in the active round",
                    snapshot.tournament.id,
                    edit.match_id
                );
                self.staging.discard(edit.match_id);
            }
        }
        self.tournament = snapshot.tournament;
        self.matches = snapshot.matches;
        self.round_loaded = true;
        self.synced_at = Utc::now();
        true
    }

    /// Reload the snapshot and active matches in one go.
    pub async fn refresh(&mut self) -> Result<bool, ProgressionError> {
        let request = self.begin_refresh();
        let snapshot = fetch_round_snapshot(&self.service, request.tournament_id).await?;
        Ok(self.apply_refresh(request.ticket, snapshot))
    }

    pub fn view(&self) -> ConsoleView {
        let matches = self
            .matches
            .iter()
            .map(|m| MatchRow {
                game: m.clone(),
                effective_result: round_gate::effective_result(m, &self.staging),
                staged: self.staging.contains(m.id),
                editable: self.tournament.stage == Stage::Playing
                    && round_gate::can_edit_match(m, &self.staging),
            })
            .collect();
        ConsoleView {
            tournament: self.tournament.clone(),
            matches,
            pending_edits: self.staging.len(),
            undecided: round_gate::undecided_count(&self.matches, &self.staging),
            can_start_draw: self.can_start_draw(),
            can_commit: self.can_commit(),
            can_advance: self.can_advance(),
            can_finish: self.can_finish(),
            can_roll_back: self.can_roll_back(),
            round_loaded: self.round_loaded,
            synced_at: self.synced_at,
        }
    }

    async fn commit_if_pending(&mut self) -> Result<(), ProgressionError> {
        if self.staging.has_pending() {
            self.commit_staged().await?;
        }
        Ok(())
    }

    async fn generate_round(&mut self) -> Result<u32, ProgressionError> {
        self.requests.issue();
        match self
            .service
            .create_next_round(&self.session, self.tournament.id)
            .await
        {
            Ok(round) => {
                self.synced_at = Utc::now();
                Ok(round)
            }
            Err(e) => {
                log::warn!(
                    "Tournament {}: round generation failed: {}",
                    self.tournament.id,
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Fetch the active round's matches after a progression. A failure leaves the round
    /// unloaded, which blocks advancing and finishing until a refresh succeeds; the progression
    /// itself has already succeeded.
    async fn reload_active_round(&mut self) {
        self.matches.clear();
        self.round_loaded = false;
        match self
            .service
            .fetch_matches(self.tournament.id, self.tournament.current_round)
            .await
        {
            Ok(matches) => {
                log::debug!(
                    "Tournament {}: loaded {} match(es) for round {}",
                    self.tournament.id,
                    matches.len(),
                    self.tournament.current_round
                );
                self.matches = matches;
                self.round_loaded = true;
            }
            Err(e) => log::warn!(
                "Tournament {}: could not load round {}: {}",
                self.tournament.id,
                self.tournament.current_round,
                e
            ),
        }
    }
}
