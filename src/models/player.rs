//! Registered player as seen in a tournament snapshot.

use serde::{Deserialize, Serialize};

/// Identifier of a tournament player in the remote system of record.
pub type PlayerId = u32;

/// A registered player. Read-only: scores and ratings are computed remotely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub full_name: String,
    pub rating: f64,
    pub score: f64,
}

impl Player {
    /// Create a player with zero score (rating as given).
    pub fn new(id: PlayerId, full_name: impl Into<String>, rating: f64) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            rating,
            score: 0.0,
        }
    }
}
