//! Results of two-phase roster operations

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Team, TeamScore};

/// Why an operation stopped to ask the user for confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationReason {
    /// The user's solo team, with all of its solves, would be discarded
    SoloTeamReset,
}

impl std::fmt::Display for ConfirmationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SoloTeamReset => write!(f, "solo_team_reset"),
        }
    }
}

/// Preview of the data a confirmed operation would destroy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedData {
    pub solve_count: i64,
    pub points: i64,
}

impl From<TeamScore> for AffectedData {
    fn from(score: TeamScore) -> Self {
        Self {
            solve_count: score.solve_count,
            points: score.points,
        }
    }
}

/// Outcome of `try_create`
///
/// Either the team was created (`team` is set) or nothing was written and the
/// caller must re-prompt with `affected_data` before calling `confirm_create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub requires_confirm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_reason: Option<ConfirmationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_data: Option<AffectedData>,
}

impl OperationResult {
    pub fn completed(team: Team) -> Self {
        Self {
            team: Some(team),
            requires_confirm: false,
            confirmation_reason: None,
            affected_data: None,
        }
    }

    pub fn needs_confirmation(reason: ConfirmationReason, affected: AffectedData) -> Self {
        Self {
            team: None,
            requires_confirm: true,
            confirmation_reason: Some(reason),
            affected_data: Some(affected),
        }
    }
}
