//! Tournament snapshot and Stage.

use crate::models::player::Player;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Illegal stage or round transition.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    /// The tournament is not in a stage that allows this transition.
    #[error("cannot {action} while the tournament is {stage}")]
    InvalidStage { stage: Stage, action: &'static str },
    /// The draw has already produced a round.
    #[error("round {0} has already been generated")]
    DrawAlreadyStarted(u32),
    /// Advancing would exceed the configured number of rounds.
    #[error("all {0} rounds have been played")]
    RoundLimitReached(u32),
    /// Finishing requires the final round to be active.
    #[error("round {current} of {total} is not the final round")]
    NotFinalRound { current: u32, total: u32 },
    /// There is no active round to roll back.
    #[error("no round to roll back")]
    NoRoundToRollBack,
}

/// Unique identifier for a tournament.
pub type TournamentId = u32;

/// Coarse lifecycle phase of a tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Published, registration not yet open.
    Announced,
    /// Players may register; no round generated.
    #[default]
    Registration,
    /// Rounds are being played; `current_round >= 1`.
    Playing,
    /// All rounds played and the tournament closed.
    Finished,
    Cancelled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Announced => "announced",
            Stage::Registration => "open for registration",
            Stage::Playing => "playing",
            Stage::Finished => "finished",
            Stage::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Tournament snapshot: stage, round counter, capacity and registered players.
///
/// `stage` and `current_round` only change through the transition methods below, which
/// keep them consistent: round 0 means no round exists yet, and `Playing` always has an
/// active round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub stage: Stage,
    pub current_round: u32,
    pub amount_of_rounds: u32,
    pub min_players: Option<u32>,
    pub max_players: Option<u32>,
    pub players: Vec<Player>,
}

impl Tournament {
    /// Create a tournament open for registration with no players and no rounds.
    pub fn new(id: TournamentId, name: impl Into<String>, amount_of_rounds: u32) -> Self {
        Self {
            id,
            name: name.into(),
            stage: Stage::Registration,
            current_round: 0,
            amount_of_rounds,
            min_players: None,
            max_players: None,
            players: Vec::new(),
        }
    }

    /// Set player capacity bounds.
    pub fn with_capacity(mut self, min_players: Option<u32>, max_players: Option<u32>) -> Self {
        self.min_players = min_players;
        self.max_players = max_players;
        self
    }

    pub fn with_players(mut self, players: Vec<Player>) -> Self {
        self.players = players;
        self
    }

    /// True when the player count has reached `max_players` (never full without a maximum).
    pub fn is_full(&self) -> bool {
        self.max_players
            .is_some_and(|max| self.players.len() >= max as usize)
    }

    /// True when `min_players` is unset or satisfied.
    pub fn has_enough_players(&self) -> bool {
        self.min_players
            .map_or(true, |min| self.players.len() >= min as usize)
    }

    pub fn is_final_round(&self) -> bool {
        self.stage == Stage::Playing && self.current_round == self.amount_of_rounds
    }

    /// Registration -> Playing with round 1.
    pub fn begin_playing(&mut self) -> Result<(), TournamentError> {
        if self.stage != Stage::Registration {
            return Err(TournamentError::InvalidStage {
                stage: self.stage,
                action: "start the draw",
            });
        }
        if self.current_round != 0 {
            return Err(TournamentError::DrawAlreadyStarted(self.current_round));
        }
        self.current_round = 1;
        self.stage = Stage::Playing;
        Ok(())
    }

    /// Playing round n -> Playing round n + 1 (n + 1 <= amount_of_rounds).
    pub fn advance_round(&mut self) -> Result<(), TournamentError> {
        if self.stage != Stage::Playing {
            return Err(TournamentError::InvalidStage {
                stage: self.stage,
                action: "advance the round",
            });
        }
        if self.current_round >= self.amount_of_rounds {
            return Err(TournamentError::RoundLimitReached(self.amount_of_rounds));
        }
        self.current_round += 1;
        Ok(())
    }

    /// Playing the final round -> Finished.
    pub fn finish(&mut self) -> Result<(), TournamentError> {
        if self.stage != Stage::Playing {
            return Err(TournamentError::InvalidStage {
                stage: self.stage,
                action: "finish",
            });
        }
        if self.current_round != self.amount_of_rounds {
            return Err(TournamentError::NotFinalRound {
                current: self.current_round,
                total: self.amount_of_rounds,
            });
        }
        self.stage = Stage::Finished;
        Ok(())
    }

    /// Playing round n -> round n - 1; back to Registration when that reaches 0.
    pub fn roll_back_round(&mut self) -> Result<(), TournamentError> {
        if self.stage != Stage::Playing {
            return Err(TournamentError::InvalidStage {
                stage: self.stage,
                action: "roll back",
            });
        }
        if self.current_round == 0 {
            return Err(TournamentError::NoRoundToRollBack);
        }
        self.current_round -= 1;
        if self.current_round == 0 {
            self.stage = Stage::Registration;
        }
        Ok(())
    }
}
