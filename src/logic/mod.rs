//! Console logic: result staging, round and registration gates, round progression.

mod freshness;
mod progression;
mod registration;
pub mod round_gate;
mod staging;

pub use freshness::{RequestSequencer, RequestTicket};
pub use progression::{
    fetch_round_snapshot, ConsoleView, MatchRow, ProgressionController, RefreshRequest,
    RoundSnapshot,
};
pub use registration::{
    can_register, check_registration, register, registration_veto, RegistrationDecision,
    RegistrationError, RegistrationVeto,
};
pub use staging::ResultStagingStore;
