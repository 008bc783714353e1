//! Collaborators consulted by the roster engine

pub mod audit;
pub mod cache;
pub mod guard;

pub use audit::{AuditSink, TransactionalAuditSink};
pub use cache::{
    CacheError, CacheInvalidation, NoopScoreboardCache, RecordingScoreboardCache,
    ScoreboardCacheInvalidator,
};
pub use guard::{CompetitionGuard, RosterGuard};
