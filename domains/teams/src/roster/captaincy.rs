//! Captain-only operations: transfer, disband, invite token rotation

use serde_json::json;
use uuid::Uuid;

use super::{load_members, lock_user_and_team, TeamRosterEngine};
use crate::domain::entities::{Team, TeamAuditAction, TeamAuditEntry, User};
use crate::domain::errors::{RosterError, RosterResult};

fn require_captain(team: &Team, user: &User) -> RosterResult<()> {
    if team.is_captain(user.id) {
        Ok(())
    } else {
        Err(RosterError::NotCaptain)
    }
}

#[derive(Debug)]
struct TransferSnapshot {
    captain: User,
    team: Team,
    new_captain: Option<User>,
}

fn validate_transfer(snapshot: &TransferSnapshot) -> RosterResult<Uuid> {
    require_captain(&snapshot.team, &snapshot.captain)?;
    snapshot
        .new_captain
        .as_ref()
        .filter(|u| u.is_member_of(snapshot.team.id))
        .map(|u| u.id)
        .ok_or(RosterError::NewCaptainNotInTeam)
}

impl TeamRosterEngine {
    /// Hand captaincy to another member of the same team
    pub async fn transfer_captain(&self, captain_id: Uuid, new_captain_id: Uuid) -> RosterResult<()> {
        if captain_id == new_captain_id {
            return Err(RosterError::CannotTransferToSelf);
        }
        self.guard.require_team_switch().await?;

        let mut tx = self.begin().await?;
        let (captain, team) = lock_user_and_team(tx.as_mut(), captain_id).await?;
        let new_captain = tx
            .get_user_by_id(new_captain_id)
            .await
            .map_err(RosterError::store("load new captain"))?;
        let snapshot = TransferSnapshot {
            captain,
            team,
            new_captain,
        };
        let new_captain_id = validate_transfer(&snapshot)?;

        tx.update_team_captain(snapshot.team.id, new_captain_id)
            .await
            .map_err(RosterError::store("update team captain"))?;
        let entry = TeamAuditEntry::new(
            snapshot.team.id,
            captain_id,
            TeamAuditAction::CaptainTransferred,
        )
        .with_details(json!({ "from": captain_id, "to": new_captain_id }));
        self.record(tx.as_mut(), entry).await?;
        Self::commit(tx).await?;

        tracing::info!(
            team_id = %snapshot.team.id,
            from = %captain_id,
            to = %new_captain_id,
            "Team captaincy transferred"
        );
        Ok(())
    }

    /// Soft-delete the captain's team and release every member
    pub async fn disband_team(&self, captain_id: Uuid) -> RosterResult<()> {
        self.guard.require_team_switch().await?;

        let mut tx = self.begin().await?;
        let (captain, team) = lock_user_and_team(tx.as_mut(), captain_id).await?;
        require_captain(&team, &captain)?;
        let members = load_members(tx.as_mut(), team.id).await?;

        tx.soft_delete_team(team.id)
            .await
            .map_err(RosterError::store("soft delete team"))?;
        for member in &members {
            tx.update_user_team(member.id, None)
                .await
                .map_err(RosterError::store("release team members"))?;
        }

        let entry = TeamAuditEntry::new(team.id, captain_id, TeamAuditAction::Deleted)
            .with_details(json!({
                "reason": "disbanded_by_captain",
                "member_count": members.len(),
            }));
        self.record(tx.as_mut(), entry).await?;
        Self::commit(tx).await?;

        tracing::info!(
            team_id = %team.id,
            captain_id = %captain_id,
            member_count = members.len(),
            "Team disbanded"
        );
        self.invalidate_all().await;
        Ok(())
    }

    /// Replace the team's invite token, invalidating the old one
    pub async fn regenerate_invite_token(&self, captain_id: Uuid) -> RosterResult<Team> {
        let mut tx = self.begin().await?;
        let (captain, mut team) = lock_user_and_team(tx.as_mut(), captain_id).await?;
        require_captain(&team, &captain)?;

        let token = Uuid::new_v4();
        tx.update_team_invite_token(team.id, token)
            .await
            .map_err(RosterError::store("update invite token"))?;
        Self::commit(tx).await?;

        team.invite_token = token;
        tracing::info!(team_id = %team.id, captain_id = %captain_id, "Invite token regenerated");
        Ok(team)
    }
}
