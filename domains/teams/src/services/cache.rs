//! Scoreboard cache invalidation
//!
//! Best-effort: the engine calls these strictly after commit and only logs
//! failures.

use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait ScoreboardCacheInvalidator: Send + Sync {
    /// Drop every cached scoreboard view
    async fn invalidate_all(&self) -> Result<(), CacheError>;

    /// Drop cached views that include the given team
    async fn invalidate_for_team(&self, team_id: Uuid) -> Result<(), CacheError>;
}

/// Invalidator for deployments without a scoreboard cache
#[derive(Debug, Clone, Default)]
pub struct NoopScoreboardCache;

#[async_trait::async_trait]
impl ScoreboardCacheInvalidator for NoopScoreboardCache {
    async fn invalidate_all(&self) -> Result<(), CacheError> {
        tracing::trace!("No scoreboard cache configured, skipping full invalidation");
        Ok(())
    }

    async fn invalidate_for_team(&self, team_id: Uuid) -> Result<(), CacheError> {
        tracing::trace!(%team_id, "No scoreboard cache configured, skipping invalidation");
        Ok(())
    }
}

/// A recorded invalidation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheInvalidation {
    All,
    Team(Uuid),
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<CacheInvalidation>,
    failing: bool,
}

/// Invalidator that records calls for test assertions.
///
/// Calls are recorded even while failing.
#[derive(Debug, Clone, Default)]
pub struct RecordingScoreboardCache {
    state: Arc<Mutex<RecorderState>>,
}

impl RecordingScoreboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all recorded invalidations, oldest first.
    pub fn recorded(&self) -> Vec<CacheInvalidation> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Make subsequent calls fail after recording
    pub fn set_failing(&self, failing: bool) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing = failing;
    }

    pub fn reset(&self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clear();
    }

    fn push(&self, call: CacheInvalidation) -> Result<(), CacheError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("recorder lock poisoned: {e}")))?;
        state.calls.push(call);
        if state.failing {
            return Err(CacheError::Unavailable("recorder set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScoreboardCacheInvalidator for RecordingScoreboardCache {
    async fn invalidate_all(&self) -> Result<(), CacheError> {
        self.push(CacheInvalidation::All)
    }

    async fn invalidate_for_team(&self, team_id: Uuid) -> Result<(), CacheError> {
        self.push(CacheInvalidation::Team(team_id))
    }
}
