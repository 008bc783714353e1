//! Leaving a team and removing members from it

use serde_json::json;
use uuid::Uuid;

use super::{load_members, lock_user_and_team, TeamRosterEngine};
use crate::domain::entities::{Team, TeamAuditAction, TeamAuditEntry, User};
use crate::domain::errors::{RosterError, RosterResult};

#[derive(Debug)]
struct LeaveSnapshot {
    user: User,
    team: Team,
    members: Vec<User>,
}

fn validate_leave(snapshot: &LeaveSnapshot) -> RosterResult<()> {
    if snapshot.members.len() <= 1 {
        return Err(RosterError::CannotLeaveAsOnlyMember);
    }
    if snapshot.team.is_captain(snapshot.user.id) {
        return Err(RosterError::NotCaptain);
    }
    Ok(())
}

#[derive(Debug)]
struct KickSnapshot {
    captain: User,
    team: Team,
    target: Option<User>,
}

/// Returns the member to remove
fn validate_kick(snapshot: &KickSnapshot) -> RosterResult<&User> {
    if !snapshot.team.is_captain(snapshot.captain.id) {
        return Err(RosterError::NotCaptain);
    }
    snapshot
        .target
        .as_ref()
        .filter(|target| target.is_member_of(snapshot.team.id))
        .ok_or(RosterError::UserNotFound)
}

impl TeamRosterEngine {
    /// Leave the current team. Captains must transfer captaincy first.
    pub async fn leave(&self, user_id: Uuid) -> RosterResult<()> {
        self.guard.require_team_switch().await?;

        let mut tx = self.begin().await?;
        let (user, team) = lock_user_and_team(tx.as_mut(), user_id).await?;
        let members = load_members(tx.as_mut(), team.id).await?;
        let snapshot = LeaveSnapshot {
            user,
            team,
            members,
        };
        validate_leave(&snapshot)?;

        tx.update_user_team(user_id, None)
            .await
            .map_err(RosterError::store("remove user from team"))?;
        let entry = TeamAuditEntry::new(snapshot.team.id, user_id, TeamAuditAction::Left);
        self.record(tx.as_mut(), entry).await?;
        Self::commit(tx).await?;

        tracing::info!(team_id = %snapshot.team.id, user_id = %user_id, "User left team");
        self.invalidate_for_team(snapshot.team.id).await;
        Ok(())
    }

    /// Remove `target_id` from the captain's team
    pub async fn kick_member(&self, captain_id: Uuid, target_id: Uuid) -> RosterResult<()> {
        if captain_id == target_id {
            return Err(RosterError::CannotKickSelf);
        }
        self.guard.require_team_switch().await?;

        let mut tx = self.begin().await?;
        let (captain, team) = lock_user_and_team(tx.as_mut(), captain_id).await?;
        let target = tx
            .get_user_by_id(target_id)
            .await
            .map_err(RosterError::store("load kick target"))?;
        let snapshot = KickSnapshot {
            captain,
            team,
            target,
        };
        let target = validate_kick(&snapshot)?;

        tx.update_user_team(target.id, None)
            .await
            .map_err(RosterError::store("remove kicked member"))?;
        let entry = TeamAuditEntry::new(snapshot.team.id, captain_id, TeamAuditAction::MemberKicked)
            .with_details(json!({ "target_user_id": target.id }));
        self.record(tx.as_mut(), entry).await?;
        Self::commit(tx).await?;

        tracing::info!(
            team_id = %snapshot.team.id,
            captain_id = %captain_id,
            target_user_id = %target_id,
            "Member kicked from team"
        );
        self.invalidate_for_team(snapshot.team.id).await;
        Ok(())
    }
}
