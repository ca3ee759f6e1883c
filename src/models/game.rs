//! Match (game), Outcome, and StagedEdit for one-on-one chess rounds.

use serde::{Deserialize, Serialize};

/// Identifier of a match in the remote system of record.
pub type MatchId = u32;

/// Decided result of a match, from white's point of view.
///
/// Serialized as the number the remote service uses: `1` white win, `0` black win, `0.5` draw.
/// An undecided match is `Option<Outcome>::None`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum Outcome {
    WhiteWin,
    BlackWin,
    Draw,
}

impl Outcome {
    /// Points scored by white.
    pub fn white_score(self) -> f64 {
        match self {
            Outcome::WhiteWin => 1.0,
            Outcome::BlackWin => 0.0,
            Outcome::Draw => 0.5,
        }
    }
}

impl From<Outcome> for f64 {
    fn from(outcome: Outcome) -> Self {
        outcome.white_score()
    }
}

impl TryFrom<f64> for Outcome {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == 1.0 {
            Ok(Outcome::WhiteWin)
        } else if value == 0.0 {
            Ok(Outcome::BlackWin)
        } else if value == 0.5 {
            Ok(Outcome::Draw)
        } else {
            Err(format!("not a valid match result: {value}"))
        }
    }
}

/// A single pairing of the tournament, as persisted remotely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub round_number: u32,
    pub white_player: String,
    pub black_player: String,
    /// None until a result has been committed.
    pub persisted_result: Option<Outcome>,
}

impl Match {
    pub fn new(
        id: MatchId,
        round_number: u32,
        white_player: impl Into<String>,
        black_player: impl Into<String>,
    ) -> Self {
        Self {
            id,
            round_number,
            white_player: white_player.into(),
            black_player: black_player.into(),
            persisted_result: None,
        }
    }

    pub fn with_result(mut self, result: Outcome) -> Self {
        self.persisted_result = Some(result);
        self
    }
}

/// One entry of a bulk result commit. `result: None` is an explicit reset to undecided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedEdit {
    #[serde(rename = "id")]
    pub match_id: MatchId,
    pub result: Option<Outcome>,
}
