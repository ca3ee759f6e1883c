//! Chess Union tournament administration: library with models, gates and round progression.

pub mod config;
pub mod logic;
pub mod models;
pub mod remote;

pub use config::{Config, ConfigError};
pub use logic::{
    can_register, check_registration, fetch_round_snapshot, register, registration_veto,
    round_gate, ConsoleView, MatchRow, ProgressionController, RefreshRequest,
    RegistrationDecision, RegistrationError, RegistrationVeto, RequestSequencer, RequestTicket,
    ResultStagingStore, RoundSnapshot,
};
pub use models::{
    AuthGrant, Credentials, Match, MatchId, Outcome, Player, PlayerId, Precondition,
    ProgressionError, Role, ServiceError, Session, Stage, StagedEdit, Tournament,
    TournamentError, TournamentId,
};
pub use remote::{HttpTournamentService, MemoryTournamentService, RemoteCall, TournamentService};
