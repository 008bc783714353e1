//! Competition policy source

use async_trait::async_trait;
use ctfboard_common::RepositoryError;
use sqlx::PgPool;
use std::sync::RwLock;

use crate::domain::policy::CompetitionPolicy;

/// Where the live competition policy is read from
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn current_policy(&self) -> Result<CompetitionPolicy, RepositoryError>;
}

/// Reads the single `competitions` row.
///
/// An empty table yields the default policy (flexible, switching allowed, no window).
#[derive(Clone)]
pub struct PgPolicySource {
    pool: PgPool,
}

impl PgPolicySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicySource for PgPolicySource {
    async fn current_policy(&self) -> Result<CompetitionPolicy, RepositoryError> {
        let policy = sqlx::query_as::<_, CompetitionPolicy>(
            r#"
            SELECT mode, allow_team_switch, starts_at, ends_at
            FROM competitions
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy.unwrap_or_default())
    }
}

/// Fixed, swappable policy for tests and tooling
#[derive(Debug, Default)]
pub struct StaticPolicySource {
    policy: RwLock<CompetitionPolicy>,
}

impl StaticPolicySource {
    pub fn new(policy: CompetitionPolicy) -> Self {
        Self {
            policy: RwLock::new(policy),
        }
    }

    /// Replace the policy seen by subsequent reads
    pub fn set(&self, policy: CompetitionPolicy) {
        let mut guard = self.policy.write().unwrap_or_else(|e| e.into_inner());
        *guard = policy;
    }
}

#[async_trait]
impl PolicySource for StaticPolicySource {
    async fn current_policy(&self) -> Result<CompetitionPolicy, RepositoryError> {
        let guard = self.policy.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}
