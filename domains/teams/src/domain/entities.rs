//! Domain entities for the CTFBoard teams domain
//!
//! Users, teams, solves and the team audit log. Only the fields needed by the
//! roster engine and the moderation operations are modelled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::errors::{RosterError, RosterResult};

/// Default upper bound on team size when none is configured
pub const DEFAULT_MAX_TEAM_SIZE: usize = 10;

/// Maximum length of a team name, in characters
pub const MAX_TEAM_NAME_LEN: usize = 64;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    /// Current team; mutated only by the roster engine under the user row lock
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            role: UserRole::default(),
            team_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the user currently belongs to the given team
    pub fn is_member_of(&self, team_id: Uuid) -> bool {
        self.team_id == Some(team_id)
    }
}

/// Team entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub invite_token: Uuid,
    pub captain_id: Uuid,
    pub bracket_id: Option<Uuid>,
    pub is_solo: bool,
    pub is_auto_created: bool,
    pub is_banned: bool,
    pub banned_at: Option<DateTime<Utc>>,
    pub banned_reason: Option<String>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Team {
    /// Create a new team with a fresh invite token
    pub fn new(name: &str, captain_id: Uuid, is_solo: bool) -> RosterResult<Self> {
        let name = Self::validate_name(name)?;

        Ok(Team {
            id: Uuid::new_v4(),
            name,
            invite_token: Uuid::new_v4(),
            captain_id,
            bracket_id: None,
            is_solo,
            is_auto_created: false,
            is_banned: false,
            banned_at: None,
            banned_reason: None,
            is_hidden: false,
            created_at: Utc::now(),
            deleted_at: None,
        })
    }

    /// Normalize and validate a team name, returning the trimmed form
    pub fn validate_name(name: &str) -> RosterResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RosterError::InvalidTeamName(
                "Team name must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > MAX_TEAM_NAME_LEN {
            return Err(RosterError::InvalidTeamName(format!(
                "Team name must be at most {} characters",
                MAX_TEAM_NAME_LEN
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Soft-deleted teams are excluded from every active lookup
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_captain(&self, user_id: Uuid) -> bool {
        self.captain_id == user_id
    }
}

/// A recorded solve. The roster engine only counts and purges these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Solve {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub points: i64,
    pub solved_at: DateTime<Utc>,
}

impl Solve {
    pub fn new(team_id: Uuid, user_id: Uuid, challenge_id: Uuid, points: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            user_id,
            challenge_id,
            points,
            solved_at: Utc::now(),
        }
    }
}

/// Aggregate of a team's recorded solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamScore {
    pub solve_count: i64,
    pub points: i64,
}

/// Actions recorded in the team audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamAuditAction {
    Created,
    Joined,
    Left,
    CaptainTransferred,
    MemberKicked,
    Deleted,
}

impl std::fmt::Display for TeamAuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamAuditAction::Created => write!(f, "created"),
            TeamAuditAction::Joined => write!(f, "joined"),
            TeamAuditAction::Left => write!(f, "left"),
            TeamAuditAction::CaptainTransferred => write!(f, "captain_transferred"),
            TeamAuditAction::MemberKicked => write!(f, "member_kicked"),
            TeamAuditAction::Deleted => write!(f, "deleted"),
        }
    }
}

/// Immutable team audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamAuditEntry {
    pub id: Uuid,
    pub team_id: Uuid,
    /// The acting user
    pub user_id: Uuid,
    pub action: TeamAuditAction,
    pub details: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl TeamAuditEntry {
    pub fn new(team_id: Uuid, user_id: Uuid, action: TeamAuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            user_id,
            action,
            details: Json(serde_json::Value::Object(Default::default())),
            created_at: Utc::now(),
        }
    }

    /// Attach freeform details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Json(details);
        self
    }

    /// Look up a string detail by key
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.0.get(key).and_then(|v| v.as_str())
    }
}
