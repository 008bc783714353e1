//! Competition policy as seen by the roster engine
//!
//! The policy is owned by the competition domain; the roster engine only reads
//! it to decide whether a roster mutation is currently permitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{RosterError, RosterResult};

/// Which kinds of teams a competition accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "competition_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompetitionMode {
    SoloOnly,
    TeamsOnly,
    #[default]
    Flexible,
}

impl CompetitionMode {
    pub fn allows_solo(&self) -> bool {
        matches!(self, Self::SoloOnly | Self::Flexible)
    }

    pub fn allows_teams(&self) -> bool {
        matches!(self, Self::TeamsOnly | Self::Flexible)
    }
}

impl std::fmt::Display for CompetitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SoloOnly => write!(f, "solo_only"),
            Self::TeamsOnly => write!(f, "teams_only"),
            Self::Flexible => write!(f, "flexible"),
        }
    }
}

/// The roster flow an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFlow {
    /// Any roster change (leave, kick, transfer, disband)
    Any,
    /// Founding or joining a multi-member team
    Teams,
    /// Founding a solo team
    Solo,
}

/// Live competition policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompetitionPolicy {
    pub mode: CompetitionMode,
    pub allow_team_switch: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Default for CompetitionPolicy {
    fn default() -> Self {
        Self {
            mode: CompetitionMode::default(),
            allow_team_switch: true,
            starts_at: None,
            ends_at: None,
        }
    }
}

impl CompetitionPolicy {
    /// Whether the competition has finished at `now`
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends_at| now > ends_at)
    }

    /// Whether rosters may change at all at `now`
    pub fn roster_open(&self, now: DateTime<Utc>) -> bool {
        self.allow_team_switch && !self.has_ended(now)
    }

    /// Check that a roster operation of the given flow is permitted at `now`
    pub fn check(&self, flow: RosterFlow, now: DateTime<Utc>) -> RosterResult<()> {
        if !self.roster_open(now) {
            return Err(RosterError::RosterFrozen);
        }

        let allowed = match flow {
            RosterFlow::Any => true,
            RosterFlow::Teams => self.mode.allows_teams(),
            RosterFlow::Solo => self.mode.allows_solo(),
        };
        if !allowed {
            return Err(RosterError::ModeNotAllowed { mode: self.mode });
        }

        Ok(())
    }
}
