//! Team repository
//!
//! Reads and moderation writes that do not touch roster membership, so they
//! run directly against the pool rather than inside a roster transaction.

use async_trait::async_trait;
use ctfboard_common::RepositoryError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Team, TeamAuditEntry};

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Find an active team by ID
    async fn get_by_id(&self, team_id: Uuid) -> Result<Option<Team>, RepositoryError>;

    async fn ban(&self, team_id: Uuid, reason: &str) -> Result<Team, RepositoryError>;

    async fn unban(&self, team_id: Uuid) -> Result<Team, RepositoryError>;

    async fn set_hidden(&self, team_id: Uuid, hidden: bool) -> Result<Team, RepositoryError>;

    async fn set_bracket(
        &self,
        team_id: Uuid,
        bracket_id: Option<Uuid>,
    ) -> Result<Team, RepositoryError>;

    /// Audit entries for a team, oldest first. Includes soft-deleted teams.
    async fn audit_history(&self, team_id: Uuid) -> Result<Vec<TeamAuditEntry>, RepositoryError>;
}

#[derive(Clone)]
pub struct PgTeamRepository {
    pool: PgPool,
}

impl PgTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamRepository for PgTeamRepository {
    async fn get_by_id(&self, team_id: Uuid) -> Result<Option<Team>, RepositoryError> {
        let row = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
                   is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
            FROM teams
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn ban(&self, team_id: Uuid, reason: &str) -> Result<Team, RepositoryError> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET is_banned = TRUE, banned_at = NOW(), banned_reason = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
                      is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
            "#,
        )
        .bind(team_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    async fn unban(&self, team_id: Uuid) -> Result<Team, RepositoryError> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET is_banned = FALSE, banned_at = NULL, banned_reason = NULL
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
                      is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
            "#,
        )
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    async fn set_hidden(&self, team_id: Uuid, hidden: bool) -> Result<Team, RepositoryError> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams SET is_hidden = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
                      is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
            "#,
        )
        .bind(team_id)
        .bind(hidden)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    async fn set_bracket(
        &self,
        team_id: Uuid,
        bracket_id: Option<Uuid>,
    ) -> Result<Team, RepositoryError> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams SET bracket_id = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
                      is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
            "#,
        )
        .bind(team_id)
        .bind(bracket_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    async fn audit_history(&self, team_id: Uuid) -> Result<Vec<TeamAuditEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, TeamAuditEntry>(
            r#"
            SELECT id, team_id, user_id, action, details, created_at
            FROM team_audit_log
            WHERE team_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
