//! Admin moderation flags. Not roster changes: no guard, no lock, no audit.

use uuid::Uuid;

use super::TeamRosterEngine;
use crate::domain::entities::Team;
use crate::domain::errors::{RosterError, RosterResult};

impl TeamRosterEngine {
    pub async fn ban_team(&self, team_id: Uuid, reason: &str) -> RosterResult<Team> {
        let team = self
            .teams
            .ban(team_id, reason.trim())
            .await
            .map_err(RosterError::store_or("ban team", RosterError::TeamNotFound))?;

        tracing::info!(%team_id, reason = %reason.trim(), "Team banned");
        self.invalidate_all().await;
        Ok(team)
    }

    pub async fn unban_team(&self, team_id: Uuid) -> RosterResult<Team> {
        let team = self
            .teams
            .unban(team_id)
            .await
            .map_err(RosterError::store_or("unban team", RosterError::TeamNotFound))?;

        tracing::info!(%team_id, "Team unbanned");
        self.invalidate_all().await;
        Ok(team)
    }

    /// Hide or show a team on the public scoreboard
    pub async fn set_hidden(&self, team_id: Uuid, hidden: bool) -> RosterResult<Team> {
        let team = self
            .teams
            .set_hidden(team_id, hidden)
            .await
            .map_err(RosterError::store_or("set team visibility", RosterError::TeamNotFound))?;

        tracing::info!(%team_id, hidden, "Team visibility changed");
        self.invalidate_all().await;
        Ok(team)
    }

    /// Assign a scoring bracket; `None` clears it
    pub async fn set_bracket(&self, team_id: Uuid, bracket_id: Option<Uuid>) -> RosterResult<Team> {
        let team = self
            .teams
            .set_bracket(team_id, bracket_id)
            .await
            .map_err(RosterError::store_or("set team bracket", RosterError::TeamNotFound))?;

        tracing::info!(%team_id, ?bracket_id, "Team bracket changed");
        self.invalidate_all().await;
        Ok(team)
    }
}
