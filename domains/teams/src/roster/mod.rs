//! Team roster engine
//!
//! Every mutating operation runs in one unit of work and is split in three:
//! `prepare_*` takes the row locks and reads what the decision needs into a
//! snapshot, `validate_*` is a pure function of that snapshot, and
//! `execute_*` performs the writes and the audit entry. Lock order is always
//! the acting user's row first, then team rows. Guard checks happen before the
//! transaction opens; cache invalidation after it commits.

mod captaincy;
mod config;
mod create;
mod join;
mod membership;
mod moderation;
mod solo;

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entities::{Team, TeamAuditEntry, User};
use crate::domain::errors::{RosterError, RosterResult};
use crate::repository::teams::TeamRepository;
use crate::repository::transactions::{RosterTransaction, UnitOfWork};
use crate::repository::users::UserRepository;
use crate::services::audit::AuditSink;
use crate::services::cache::ScoreboardCacheInvalidator;
use crate::services::guard::RosterGuard;

pub use config::RosterConfig;
pub use solo::{PriorTeam, SoloCleanupVerdict};

/// Collaborators injected into [`TeamRosterEngine`]
#[derive(Clone)]
pub struct RosterDependencies {
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub users: Arc<dyn UserRepository>,
    pub teams: Arc<dyn TeamRepository>,
    pub guard: Arc<dyn RosterGuard>,
    pub audit: Arc<dyn AuditSink>,
    pub cache: Arc<dyn ScoreboardCacheInvalidator>,
}

#[derive(Clone)]
pub struct TeamRosterEngine {
    unit_of_work: Arc<dyn UnitOfWork>,
    users: Arc<dyn UserRepository>,
    teams: Arc<dyn TeamRepository>,
    guard: Arc<dyn RosterGuard>,
    audit: Arc<dyn AuditSink>,
    cache: Arc<dyn ScoreboardCacheInvalidator>,
    config: RosterConfig,
}

impl TeamRosterEngine {
    pub fn new(deps: RosterDependencies, config: RosterConfig) -> Self {
        Self {
            unit_of_work: deps.unit_of_work,
            users: deps.users,
            teams: deps.teams,
            guard: deps.guard,
            audit: deps.audit,
            cache: deps.cache,
            config,
        }
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Active team by ID
    pub async fn get_team(&self, team_id: Uuid) -> RosterResult<Team> {
        self.teams
            .get_by_id(team_id)
            .await
            .map_err(RosterError::store("load team"))?
            .ok_or(RosterError::TeamNotFound)
    }

    /// The user's current team together with its members
    pub async fn my_team(&self, user_id: Uuid) -> RosterResult<(Team, Vec<User>)> {
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .map_err(RosterError::store("load user"))?
            .ok_or(RosterError::UserNotFound)?;
        let team_id = user.team_id.ok_or(RosterError::TeamNotFound)?;

        let team = self.get_team(team_id).await?;
        let members = self.team_members(team.id).await?;
        Ok((team, members))
    }

    /// Current members of an active team, oldest first
    pub async fn team_members(&self, team_id: Uuid) -> RosterResult<Vec<User>> {
        let team = self.get_team(team_id).await?;
        self.users
            .get_by_team(team.id)
            .await
            .map_err(RosterError::store("load team members"))
    }

    /// Audit log of a team, oldest first. Soft-deleted teams keep their history.
    pub async fn audit_history(&self, team_id: Uuid) -> RosterResult<Vec<TeamAuditEntry>> {
        self.teams
            .audit_history(team_id)
            .await
            .map_err(RosterError::store("load audit history"))
    }

    async fn begin(&self) -> RosterResult<Box<dyn RosterTransaction>> {
        self.unit_of_work
            .begin()
            .await
            .map_err(RosterError::store("begin transaction"))
    }

    async fn commit(tx: Box<dyn RosterTransaction>) -> RosterResult<()> {
        tx.commit()
            .await
            .map_err(RosterError::store("commit transaction"))
    }

    async fn record(
        &self,
        tx: &mut dyn RosterTransaction,
        entry: TeamAuditEntry,
    ) -> RosterResult<()> {
        self.audit
            .record(tx, entry)
            .await
            .map_err(RosterError::store("record audit entry"))
    }

    async fn invalidate_all(&self) {
        if let Err(e) = self.cache.invalidate_all().await {
            tracing::warn!(error = %e, "Scoreboard cache invalidation failed");
        }
    }

    async fn invalidate_for_team(&self, team_id: Uuid) {
        if let Err(e) = self.cache.invalidate_for_team(team_id).await {
            tracing::warn!(%team_id, error = %e, "Scoreboard cache invalidation failed");
        }
    }
}

async fn lock_user(tx: &mut dyn RosterTransaction, user_id: Uuid) -> RosterResult<User> {
    tx.lock_user_row(user_id)
        .await
        .map_err(RosterError::store_or("lock user row", RosterError::UserNotFound))
}

async fn lock_team(tx: &mut dyn RosterTransaction, team_id: Uuid) -> RosterResult<Team> {
    tx.lock_team_row(team_id)
        .await
        .map_err(RosterError::store_or("lock team row", RosterError::TeamNotFound))
}

/// Lock the user and the team they currently belong to.
async fn lock_user_and_team(
    tx: &mut dyn RosterTransaction,
    user_id: Uuid,
) -> RosterResult<(User, Team)> {
    let user = lock_user(tx, user_id).await?;
    let team_id = user.team_id.ok_or(RosterError::TeamNotFound)?;
    let team = lock_team(tx, team_id).await?;
    Ok((user, team))
}

async fn load_members(tx: &mut dyn RosterTransaction, team_id: Uuid) -> RosterResult<Vec<User>> {
    tx.get_users_by_team(team_id)
        .await
        .map_err(RosterError::store("load team members"))
}
