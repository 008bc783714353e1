//! User repository

use async_trait::async_trait;
use ctfboard_common::RepositoryError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::User;

/// Non-transactional user reads
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get user by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Members of a team, oldest first
    async fn get_by_team(&self, team_id: Uuid) -> Result<Vec<User>, RepositoryError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, team_id, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_by_team(&self, team_id: Uuid) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, team_id, created_at
            FROM users
            WHERE team_id = $1
            ORDER BY created_at ASC, username ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
