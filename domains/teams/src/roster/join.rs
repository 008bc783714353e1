//! Joining a team by invite token

use serde_json::json;
use uuid::Uuid;

use super::solo::{load_prior_team, validate_solo_cleanup, PriorTeam};
use super::{load_members, lock_team, lock_user, TeamRosterEngine};
use crate::domain::entities::{Team, TeamAuditAction, TeamAuditEntry, User};
use crate::domain::errors::{RosterError, RosterResult};
use crate::repository::transactions::RosterTransaction;

#[derive(Debug)]
struct JoinSnapshot {
    user: User,
    team: Team,
    member_count: usize,
    prior: Option<PriorTeam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinPlan {
    Join,
    ReplaceSoloAndJoin,
}

fn validate_join(
    snapshot: &JoinSnapshot,
    max_team_size: usize,
    confirm_reset: bool,
) -> RosterResult<JoinPlan> {
    if snapshot.user.is_member_of(snapshot.team.id) {
        return Err(RosterError::UserAlreadyInTeam);
    }
    if snapshot.member_count >= max_team_size {
        return Err(RosterError::TeamFull { max: max_team_size });
    }
    match &snapshot.prior {
        None => Ok(JoinPlan::Join),
        Some(prior) => {
            validate_solo_cleanup(prior, snapshot.user.id, confirm_reset)?;
            Ok(JoinPlan::ReplaceSoloAndJoin)
        }
    }
}

async fn prepare_join(
    tx: &mut dyn RosterTransaction,
    invite_token: Uuid,
    user_id: Uuid,
) -> RosterResult<JoinSnapshot> {
    let user = lock_user(tx, user_id).await?;

    let target = tx
        .get_team_by_invite_token(invite_token)
        .await
        .map_err(RosterError::store("resolve invite token"))?
        .ok_or(RosterError::TeamNotFound)?;
    let team = lock_team(tx, target.id).await?;
    // The token may have rotated between resolve and lock
    if team.invite_token != invite_token {
        return Err(RosterError::TeamNotFound);
    }

    let member_count = load_members(tx, team.id).await?.len();

    let prior = match user.team_id {
        Some(prior_id) if prior_id != team.id => load_prior_team(tx, prior_id).await?,
        _ => None,
    };

    Ok(JoinSnapshot {
        user,
        team,
        member_count,
        prior,
    })
}

impl TeamRosterEngine {
    /// Join the team identified by `invite_token`.
    ///
    /// Malformed tokens are reported as `TeamNotFound`.
    pub async fn join(
        &self,
        invite_token: &str,
        user_id: Uuid,
        confirm_reset: bool,
    ) -> RosterResult<Team> {
        let token = Uuid::parse_str(invite_token.trim()).map_err(|_| RosterError::TeamNotFound)?;
        self.guard.require_team_switch().await?;

        let mut tx = self.begin().await?;
        let snapshot = prepare_join(tx.as_mut(), token, user_id).await?;
        let plan = validate_join(&snapshot, self.config.max_team_size, confirm_reset)?;

        if let (JoinPlan::ReplaceSoloAndJoin, Some(prior)) = (plan, snapshot.prior.as_ref()) {
            self.execute_solo_cleanup(tx.as_mut(), prior, user_id).await?;
        }

        tx.update_user_team(user_id, Some(snapshot.team.id))
            .await
            .map_err(RosterError::store("assign user to team"))?;

        let mut entry = TeamAuditEntry::new(snapshot.team.id, user_id, TeamAuditAction::Joined);
        if let Some(prior) = &snapshot.prior {
            entry = entry.with_details(json!({ "replaced_team_id": prior.team.id }));
        }
        self.record(tx.as_mut(), entry).await?;
        Self::commit(tx).await?;

        tracing::info!(
            team_id = %snapshot.team.id,
            user_id = %user_id,
            members = snapshot.member_count + 1,
            "User joined team"
        );
        match plan {
            JoinPlan::Join => self.invalidate_for_team(snapshot.team.id).await,
            JoinPlan::ReplaceSoloAndJoin => self.invalidate_all().await,
        }
        Ok(snapshot.team)
    }
}
