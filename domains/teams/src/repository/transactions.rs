//! Unit of work for roster mutations
//!
//! A [`UnitOfWork`] hands out [`RosterTransaction`]s: one atomic, lockable
//! execution context per roster operation. Dropping a transaction without
//! calling [`RosterTransaction::commit`] rolls it back.
//!
//! The Postgres adapter is built from transactional free functions (Zero2Prod
//! pattern) that take an open `sqlx` transaction.

use async_trait::async_trait;
use ctfboard_common::RepositoryError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entities::{Team, TeamAuditEntry, TeamScore, User};

type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Source of roster transactions
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn RosterTransaction>>;
}

/// Operations available inside one roster unit of work.
///
/// `lock_*` methods take a row-level write lock held until commit or rollback
/// and return the locked row. Team lookups only ever see non-deleted teams.
#[async_trait]
pub trait RosterTransaction: Send {
    /// Lock a user row. `NotFound` if the user does not exist.
    async fn lock_user_row(&mut self, user_id: Uuid) -> RepoResult<User>;

    /// Lock an active team row. `NotFound` if missing or soft-deleted.
    async fn lock_team_row(&mut self, team_id: Uuid) -> RepoResult<Team>;

    async fn get_user_by_id(&mut self, user_id: Uuid) -> RepoResult<Option<User>>;

    async fn get_team_by_name(&mut self, name: &str) -> RepoResult<Option<Team>>;

    async fn get_team_by_id(&mut self, team_id: Uuid) -> RepoResult<Option<Team>>;

    async fn get_team_by_invite_token(&mut self, token: Uuid) -> RepoResult<Option<Team>>;

    async fn get_users_by_team(&mut self, team_id: Uuid) -> RepoResult<Vec<User>>;

    async fn get_team_score(&mut self, team_id: Uuid) -> RepoResult<TeamScore>;

    /// Insert a team. `AlreadyExists` if an active team has the same name.
    async fn create_team(&mut self, team: &Team) -> RepoResult<Team>;

    async fn update_user_team(&mut self, user_id: Uuid, team_id: Option<Uuid>) -> RepoResult<()>;

    async fn update_team_captain(&mut self, team_id: Uuid, captain_id: Uuid) -> RepoResult<()>;

    async fn update_team_invite_token(&mut self, team_id: Uuid, token: Uuid) -> RepoResult<()>;

    async fn soft_delete_team(&mut self, team_id: Uuid) -> RepoResult<()>;

    /// Delete every solve recorded for a team, returning how many were removed
    async fn delete_solves_by_team(&mut self, team_id: Uuid) -> RepoResult<u64>;

    async fn create_audit_entry(&mut self, entry: &TeamAuditEntry) -> RepoResult<()>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;
}

/// Postgres-backed [`UnitOfWork`]
#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn begin(&self) -> RepoResult<Box<dyn RosterTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgRosterTransaction { tx }))
    }
}

/// An open Postgres roster transaction
pub struct PgRosterTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RosterTransaction for PgRosterTransaction {
    async fn lock_user_row(&mut self, user_id: Uuid) -> RepoResult<User> {
        lock_user_row_tx(&mut self.tx, user_id).await
    }

    async fn lock_team_row(&mut self, team_id: Uuid) -> RepoResult<Team> {
        lock_team_row_tx(&mut self.tx, team_id).await
    }

    async fn get_user_by_id(&mut self, user_id: Uuid) -> RepoResult<Option<User>> {
        get_user_by_id_tx(&mut self.tx, user_id).await
    }

    async fn get_team_by_name(&mut self, name: &str) -> RepoResult<Option<Team>> {
        get_team_by_name_tx(&mut self.tx, name).await
    }

    async fn get_team_by_id(&mut self, team_id: Uuid) -> RepoResult<Option<Team>> {
        get_team_by_id_tx(&mut self.tx, team_id).await
    }

    async fn get_team_by_invite_token(&mut self, token: Uuid) -> RepoResult<Option<Team>> {
        get_team_by_invite_token_tx(&mut self.tx, token).await
    }

    async fn get_users_by_team(&mut self, team_id: Uuid) -> RepoResult<Vec<User>> {
        get_users_by_team_tx(&mut self.tx, team_id).await
    }

    async fn get_team_score(&mut self, team_id: Uuid) -> RepoResult<TeamScore> {
        get_team_score_tx(&mut self.tx, team_id).await
    }

    async fn create_team(&mut self, team: &Team) -> RepoResult<Team> {
        create_team_tx(&mut self.tx, team).await
    }

    async fn update_user_team(&mut self, user_id: Uuid, team_id: Option<Uuid>) -> RepoResult<()> {
        update_user_team_tx(&mut self.tx, user_id, team_id).await
    }

    async fn update_team_captain(&mut self, team_id: Uuid, captain_id: Uuid) -> RepoResult<()> {
        update_team_captain_tx(&mut self.tx, team_id, captain_id).await
    }

    async fn update_team_invite_token(&mut self, team_id: Uuid, token: Uuid) -> RepoResult<()> {
        update_team_invite_token_tx(&mut self.tx, team_id, token).await
    }

    async fn soft_delete_team(&mut self, team_id: Uuid) -> RepoResult<()> {
        soft_delete_team_tx(&mut self.tx, team_id).await
    }

    async fn delete_solves_by_team(&mut self, team_id: Uuid) -> RepoResult<u64> {
        delete_solves_by_team_tx(&mut self.tx, team_id).await
    }

    async fn create_audit_entry(&mut self, entry: &TeamAuditEntry) -> RepoResult<()> {
        create_audit_entry_tx(&mut self.tx, entry).await
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        // Dropping without commit rolls back
        self.tx.commit().await?;
        Ok(())
    }
}

/// Lock a user row (`FOR UPDATE`) and return it.
pub async fn lock_user_row_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> RepoResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, role, team_id, created_at
        FROM users
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **transaction)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Lock an active team row (`FOR UPDATE`) and return it.
pub async fn lock_team_row_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
) -> RepoResult<Team> {
    sqlx::query_as::<_, Team>(
        r#"
        SELECT id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
               is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
        FROM teams
        WHERE id = $1 AND deleted_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(team_id)
    .fetch_optional(&mut **transaction)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Read a user row without locking it.
pub async fn get_user_by_id_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, role, team_id, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(user)
}

pub async fn get_team_by_name_tx(
    transaction: &mut Transaction<'_, Postgres>,
    name: &str,
) -> RepoResult<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
               is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
        FROM teams
        WHERE name = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(name)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(team)
}

pub async fn get_team_by_id_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
) -> RepoResult<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
               is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
        FROM teams
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(team_id)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(team)
}

pub async fn get_team_by_invite_token_tx(
    transaction: &mut Transaction<'_, Postgres>,
    token: Uuid,
) -> RepoResult<Option<Team>> {
    if token.is_nil() {
        return Ok(None);
    }

    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
               is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
        FROM teams
        WHERE invite_token = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(token)
    .fetch_optional(&mut **transaction)
    .await?;
    Ok(team)
}

/// Current members of a team, oldest first.
pub async fn get_users_by_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
) -> RepoResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, role, team_id, created_at
        FROM users
        WHERE team_id = $1
        ORDER BY created_at ASC, username ASC
        "#,
    )
    .bind(team_id)
    .fetch_all(&mut **transaction)
    .await?;
    Ok(users)
}

pub async fn get_team_score_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
) -> RepoResult<TeamScore> {
    let score = sqlx::query_as::<_, TeamScore>(
        r#"
        SELECT COUNT(*) AS solve_count,
               COALESCE(SUM(points), 0)::BIGINT AS points
        FROM solves
        WHERE team_id = $1
        "#,
    )
    .bind(team_id)
    .fetch_one(&mut **transaction)
    .await?;
    Ok(score)
}

/// Insert a team. A clash on the active-name unique index maps to `AlreadyExists`.
pub async fn create_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team: &Team,
) -> RepoResult<Team> {
    let created = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (id, name, invite_token, captain_id, bracket_id, is_solo,
                           is_auto_created, is_banned, banned_at, banned_reason,
                           is_hidden, created_at, deleted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id, name, invite_token, captain_id, bracket_id, is_solo, is_auto_created,
                  is_banned, banned_at, banned_reason, is_hidden, created_at, deleted_at
        "#,
    )
    .bind(team.id)
    .bind(&team.name)
    .bind(team.invite_token)
    .bind(team.captain_id)
    .bind(team.bracket_id)
    .bind(team.is_solo)
    .bind(team.is_auto_created)
    .bind(team.is_banned)
    .bind(team.banned_at)
    .bind(&team.banned_reason)
    .bind(team.is_hidden)
    .bind(team.created_at)
    .bind(team.deleted_at)
    .fetch_one(&mut **transaction)
    .await?;
    Ok(created)
}

pub async fn update_user_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    team_id: Option<Uuid>,
) -> RepoResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE users SET team_id = $2
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(team_id)
    .execute(&mut **transaction)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

pub async fn update_team_captain_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
    captain_id: Uuid,
) -> RepoResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE teams SET captain_id = $2
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(team_id)
    .bind(captain_id)
    .execute(&mut **transaction)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

pub async fn update_team_invite_token_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
    token: Uuid,
) -> RepoResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE teams SET invite_token = $2
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(team_id)
    .bind(token)
    .execute(&mut **transaction)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Soft-delete an active team.
///
/// Returns `RepositoryError::NotFound` if the team does not exist or is
/// already deleted (deleted_at IS NOT NULL).
pub async fn soft_delete_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
) -> RepoResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE teams SET deleted_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(team_id)
    .execute(&mut **transaction)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

pub async fn delete_solves_by_team_tx(
    transaction: &mut Transaction<'_, Postgres>,
    team_id: Uuid,
) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM solves WHERE team_id = $1")
        .bind(team_id)
        .execute(&mut **transaction)
        .await?;
    Ok(result.rows_affected())
}

pub async fn create_audit_entry_tx(
    transaction: &mut Transaction<'_, Postgres>,
    entry: &TeamAuditEntry,
) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO team_audit_log (id, team_id, user_id, action, details, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.id)
    .bind(entry.team_id)
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(&entry.details)
    .bind(entry.created_at)
    .execute(&mut **transaction)
    .await?;
    Ok(())
}
