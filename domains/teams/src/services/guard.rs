//! Roster guard
//!
//! Answers "is a roster mutation currently permitted?" from the live
//! competition policy. Consulted once per operation, before any row lock.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::domain::errors::{RosterError, RosterResult};
use crate::domain::policy::{CompetitionPolicy, RosterFlow};
use crate::repository::competitions::PolicySource;

#[async_trait]
pub trait RosterGuard: Send + Sync {
    /// Fails `RosterFrozen` when team switching is disabled or the competition has ended
    async fn require_team_switch(&self) -> RosterResult<CompetitionPolicy>;

    /// Additionally fails `ModeNotAllowed` in solo-only competitions
    async fn require_team_switch_and_teams_mode(&self) -> RosterResult<CompetitionPolicy>;

    /// Additionally fails `ModeNotAllowed` in teams-only competitions
    async fn require_team_switch_and_solo_mode(&self) -> RosterResult<CompetitionPolicy>;
}

/// Guard backed by a [`PolicySource`]
#[derive(Clone)]
pub struct CompetitionGuard {
    source: Arc<dyn PolicySource>,
}

impl CompetitionGuard {
    pub fn new(source: Arc<dyn PolicySource>) -> Self {
        Self { source }
    }

    async fn evaluate(&self, flow: RosterFlow) -> RosterResult<CompetitionPolicy> {
        let policy = self
            .source
            .current_policy()
            .await
            .map_err(RosterError::store("load competition policy"))?;

        if let Err(e) = policy.check(flow, Utc::now()) {
            tracing::debug!(
                ?flow,
                mode = %policy.mode,
                allow_team_switch = policy.allow_team_switch,
                error = %e,
                "Roster guard rejected operation"
            );
            return Err(e);
        }

        Ok(policy)
    }
}

#[async_trait]
impl RosterGuard for CompetitionGuard {
    async fn require_team_switch(&self) -> RosterResult<CompetitionPolicy> {
        self.evaluate(RosterFlow::Any).await
    }

    async fn require_team_switch_and_teams_mode(&self) -> RosterResult<CompetitionPolicy> {
        self.evaluate(RosterFlow::Teams).await
    }

    async fn require_team_switch_and_solo_mode(&self) -> RosterResult<CompetitionPolicy> {
        self.evaluate(RosterFlow::Solo).await
    }
}
