//! Roster error taxonomy
//!
//! Sentinel variants are matched by callers; every store failure is wrapped in
//! [`RosterError::Store`] together with the name of the step that failed.

use ctfboard_common::{Error as AppError, RepositoryError};
use thiserror::Error;

use crate::domain::policy::CompetitionMode;

pub type RosterResult<T> = std::result::Result<T, RosterError>;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Roster changes are currently frozen")]
    RosterFrozen,

    #[error("Competition mode {mode} does not allow this operation")]
    ModeNotAllowed { mode: CompetitionMode },

    #[error("Team already exists")]
    TeamAlreadyExists,

    #[error("Team not found")]
    TeamNotFound,

    #[error("Team is full ({max} members)")]
    TeamFull { max: usize },

    #[error("User already in team")]
    UserAlreadyInTeam,

    #[error("Confirmation required: the current solo team and its solves will be discarded")]
    ConfirmationRequired,

    #[error("Only the captain can perform this action")]
    NotCaptain,

    #[error("New captain must be a member of the team")]
    NewCaptainNotInTeam,

    #[error("Cannot transfer captaincy to yourself")]
    CannotTransferToSelf,

    #[error("Cannot leave team as only member, disband the team instead")]
    CannotLeaveAsOnlyMember,

    #[error("Cannot kick yourself, leave the team instead")]
    CannotKickSelf,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid team name: {0}")]
    InvalidTeamName(String),

    #[error("{step}: {source}")]
    Store {
        step: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl RosterError {
    /// Wrap a repository failure with the name of the failing step.
    pub fn store(step: &'static str) -> impl FnOnce(RepositoryError) -> RosterError {
        move |source| RosterError::Store { step, source }
    }

    /// Like [`RosterError::store`], but a missing row becomes `missing`.
    pub fn store_or(
        step: &'static str,
        missing: RosterError,
    ) -> impl FnOnce(RepositoryError) -> RosterError {
        move |source| match source {
            RepositoryError::NotFound => missing,
            source => RosterError::Store { step, source },
        }
    }

    /// The caller should re-prompt with an `AffectedData` preview rather than fail.
    pub fn is_confirmation_required(&self) -> bool {
        matches!(self, RosterError::ConfirmationRequired)
    }

    /// Name of the failing step for store errors
    pub fn failed_step(&self) -> Option<&'static str> {
        match self {
            RosterError::Store { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::RosterFrozen => "ROSTER_FROZEN",
            RosterError::ModeNotAllowed { .. } => "MODE_NOT_ALLOWED",
            RosterError::TeamAlreadyExists => "TEAM_ALREADY_EXISTS",
            RosterError::TeamNotFound => "TEAM_NOT_FOUND",
            RosterError::TeamFull { .. } => "TEAM_FULL",
            RosterError::UserAlreadyInTeam => "USER_ALREADY_IN_TEAM",
            RosterError::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            RosterError::NotCaptain => "NOT_CAPTAIN",
            RosterError::NewCaptainNotInTeam => "NEW_CAPTAIN_NOT_IN_TEAM",
            RosterError::CannotTransferToSelf => "CANNOT_TRANSFER_TO_SELF",
            RosterError::CannotLeaveAsOnlyMember => "CANNOT_LEAVE_AS_ONLY_MEMBER",
            RosterError::CannotKickSelf => "CANNOT_KICK_SELF",
            RosterError::UserNotFound => "USER_NOT_FOUND",
            RosterError::InvalidTeamName(_) => "INVALID_TEAM_NAME",
            RosterError::Store { .. } => "STORE_ERROR",
        }
    }
}

impl From<RosterError> for AppError {
    fn from(err: RosterError) -> Self {
        let message = err.to_string();
        match err {
            RosterError::RosterFrozen
            | RosterError::ModeNotAllowed { .. }
            | RosterError::NotCaptain => AppError::Authorization(message),
            RosterError::TeamNotFound | RosterError::UserNotFound => AppError::NotFound(message),
            RosterError::TeamAlreadyExists
            | RosterError::TeamFull { .. }
            | RosterError::UserAlreadyInTeam
            | RosterError::CannotLeaveAsOnlyMember => AppError::Conflict(message),
            RosterError::ConfirmationRequired => AppError::ConfirmationRequired(message),
            RosterError::NewCaptainNotInTeam
            | RosterError::CannotTransferToSelf
            | RosterError::CannotKickSelf
            | RosterError::InvalidTeamName(_) => AppError::Validation(message),
            RosterError::Store { step, source } => match source {
                RepositoryError::Connection(e) => AppError::Database(e),
                other => AppError::Internal(format!("{}: {}", step, other)),
            },
        }
    }
}
