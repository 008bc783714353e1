//! Teams domain: users, teams, competition policy and the team roster engine

pub mod domain;
pub mod repository;
pub mod roster;
pub mod services;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::errors::{RosterError, RosterResult};
pub use domain::outcome::{AffectedData, ConfirmationReason, OperationResult};
pub use domain::policy::{CompetitionMode, CompetitionPolicy, RosterFlow};
// Re-export repository types
pub use repository::{
    InMemoryRosterStore, PgPolicySource, PgTeamRepository, PgUnitOfWork, PgUserRepository,
    PolicySource, RosterTransaction, StaticPolicySource, TeamRepository, TeamsRepositories,
    UnitOfWork, UserRepository,
};
// Re-export the engine and its collaborators
pub use roster::{RosterConfig, RosterDependencies, TeamRosterEngine};
pub use services::{
    AuditSink, CacheError, CacheInvalidation, CompetitionGuard, NoopScoreboardCache,
    RecordingScoreboardCache, RosterGuard, ScoreboardCacheInvalidator, TransactionalAuditSink,
};
