//! `rosterctl`: operator CLI for the team roster engine
//!
//! Every subcommand maps onto one engine operation and prints its result as
//! JSON on stdout. Failures are reported as [`AppError`], whose exit code
//! tells scripts a rejected request apart from a broken system.

use clap::{ArgAction, Parser, Subcommand};
use ctfboard_common::{Error as AppError, Result};
use ctfboard_teams::{RosterError, TeamRosterEngine};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// CTFBoard team roster administration
#[derive(Debug, Parser)]
#[command(name = "rosterctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Found a team with the given captain
    CreateTeam {
        #[arg(long)]
        captain: Uuid,
        #[arg(long)]
        name: String,
        /// Mark the team as a solo team
        #[arg(long)]
        solo: bool,
        /// Discard the captain's current solo team and its solves
        #[arg(long)]
        confirm_reset: bool,
    },

    /// Found a team, or report what confirming would discard
    TryCreate {
        #[arg(long)]
        captain: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        solo: bool,
    },

    /// Found a team, discarding the captain's solo team
    ConfirmCreate {
        #[arg(long)]
        captain: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        solo: bool,
    },

    /// Join a team by invite token
    Join {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        token: String,
        #[arg(long)]
        confirm_reset: bool,
    },

    /// Leave the current team
    Leave {
        #[arg(long)]
        user: Uuid,
    },

    /// Hand captaincy to a teammate
    Transfer {
        #[arg(long)]
        captain: Uuid,
        #[arg(long)]
        to: Uuid,
    },

    /// Remove a member from the captain's team
    Kick {
        #[arg(long)]
        captain: Uuid,
        #[arg(long)]
        target: Uuid,
    },

    /// Disband the captain's team
    Disband {
        #[arg(long)]
        captain: Uuid,
    },

    /// Put a user on a fresh solo team
    Solo {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        confirm_reset: bool,
    },

    /// Issue a new invite token for the captain's team
    RotateToken {
        #[arg(long)]
        captain: Uuid,
    },

    /// Ban a team from the scoreboard
    Ban {
        #[arg(long)]
        team: Uuid,
        #[arg(long)]
        reason: String,
    },

    /// Lift a team ban
    Unban {
        #[arg(long)]
        team: Uuid,
    },

    /// Hide or show a team on the scoreboard
    SetHidden {
        #[arg(long)]
        team: Uuid,
        #[arg(long, action = ArgAction::Set)]
        hidden: bool,
    },

    /// Assign a scoring bracket (omit --bracket to clear it)
    SetBracket {
        #[arg(long)]
        team: Uuid,
        #[arg(long)]
        bracket: Option<Uuid>,
    },

    /// Show an active team
    Show {
        #[arg(long)]
        team: Uuid,
    },

    /// Show a user's team and its members
    MyTeam {
        #[arg(long)]
        user: Uuid,
    },

    /// List the members of a team
    Members {
        #[arg(long)]
        team: Uuid,
    },

    /// Print a team's audit history
    Audit {
        #[arg(long)]
        team: Uuid,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn roster_failure(err: RosterError) -> AppError {
    tracing::debug!(code = err.code(), step = ?err.failed_step(), "Roster operation failed");
    err.into()
}

/// One line for stderr: `[CODE] message`
pub fn render_failure(err: &AppError) -> String {
    format!("[{}] {}", err.error_code(), err)
}

/// Run a roster subcommand. `Migrate` is handled by the caller.
pub async fn execute(engine: &TeamRosterEngine, command: Command) -> Result<()> {
    match command {
        Command::Migrate => Err(AppError::Internal(
            "migrate must run before the engine is built".to_string(),
        )),
        Command::CreateTeam {
            captain,
            name,
            solo,
            confirm_reset,
        } => {
            let team = engine
                .create(&name, captain, solo, confirm_reset)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::TryCreate {
            captain,
            name,
            solo,
        } => {
            let outcome = engine
                .try_create(&name, captain, solo)
                .await
                .map_err(roster_failure)?;
            print_json(&outcome)
        }
        Command::ConfirmCreate {
            captain,
            name,
            solo,
        } => {
            let team = engine
                .confirm_create(&name, captain, solo)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::Join {
            user,
            token,
            confirm_reset,
        } => {
            let team = engine
                .join(&token, user, confirm_reset)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::Leave { user } => {
            engine.leave(user).await.map_err(roster_failure)?;
            print_json(&json!({ "left": true, "user_id": user }))
        }
        Command::Transfer { captain, to } => {
            engine
                .transfer_captain(captain, to)
                .await
                .map_err(roster_failure)?;
            print_json(&json!({ "captain_id": to }))
        }
        Command::Kick { captain, target } => {
            engine
                .kick_member(captain, target)
                .await
                .map_err(roster_failure)?;
            print_json(&json!({ "kicked_user_id": target }))
        }
        Command::Disband { captain } => {
            engine.disband_team(captain).await.map_err(roster_failure)?;
            print_json(&json!({ "disbanded": true }))
        }
        Command::Solo {
            user,
            confirm_reset,
        } => {
            let team = engine
                .create_solo_team(user, confirm_reset)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::RotateToken { captain } => {
            let team = engine
                .regenerate_invite_token(captain)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::Ban { team, reason } => {
            let team = engine
                .ban_team(team, &reason)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::Unban { team } => {
            let team = engine.unban_team(team).await.map_err(roster_failure)?;
            print_json(&team)
        }
        Command::SetHidden { team, hidden } => {
            let team = engine
                .set_hidden(team, hidden)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::SetBracket { team, bracket } => {
            let team = engine
                .set_bracket(team, bracket)
                .await
                .map_err(roster_failure)?;
            print_json(&team)
        }
        Command::Show { team } => {
            let team = engine.get_team(team).await.map_err(roster_failure)?;
            print_json(&team)
        }
        Command::MyTeam { user } => {
            let (team, members) = engine.my_team(user).await.map_err(roster_failure)?;
            print_json(&json!({ "team": team, "members": members }))
        }
        Command::Members { team } => {
            let members = engine.team_members(team).await.map_err(roster_failure)?;
            print_json(&members)
        }
        Command::Audit { team } => {
            let entries = engine.audit_history(team).await.map_err(roster_failure)?;
            print_json(&entries)
        }
    }
}
