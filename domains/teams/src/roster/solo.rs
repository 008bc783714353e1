//! Solo team cleanup
//!
//! A user whose current team is a throwaway single-member team (created solo
//! or auto-created for them) may replace it when founding or joining a real
//! team, but only after explicitly consenting to lose its solves.

use ctfboard_common::RepositoryError;
use serde_json::json;
use uuid::Uuid;

use super::TeamRosterEngine;
use crate::domain::entities::{Team, TeamAuditAction, TeamAuditEntry, User};
use crate::domain::errors::{RosterError, RosterResult};
use crate::domain::outcome::AffectedData;
use crate::repository::transactions::RosterTransaction;

/// The actor's current team, locked, with its members
#[derive(Debug, Clone)]
pub struct PriorTeam {
    pub team: Team,
    pub members: Vec<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoloCleanupVerdict {
    /// Prior team may be discarded once the user confirms
    Eligible,
    /// Prior team is a real team; the user must leave it first
    NotEligible,
}

impl PriorTeam {
    pub fn assess(&self, actor_id: Uuid) -> SoloCleanupVerdict {
        let sole_member = matches!(self.members.as_slice(), [only] if only.id == actor_id);
        if sole_member && (self.team.is_solo || self.team.is_auto_created) {
            SoloCleanupVerdict::Eligible
        } else {
            SoloCleanupVerdict::NotEligible
        }
    }
}

/// Decide whether the actor may proceed past their prior team
pub fn validate_solo_cleanup(
    prior: &PriorTeam,
    actor_id: Uuid,
    confirm_reset: bool,
) -> RosterResult<()> {
    match prior.assess(actor_id) {
        SoloCleanupVerdict::NotEligible => Err(RosterError::UserAlreadyInTeam),
        SoloCleanupVerdict::Eligible if !confirm_reset => Err(RosterError::ConfirmationRequired),
        SoloCleanupVerdict::Eligible => Ok(()),
    }
}

/// Lock and read the team a user currently references.
///
/// `None` when the reference points at a team that is no longer active.
pub(super) async fn load_prior_team(
    tx: &mut dyn RosterTransaction,
    team_id: Uuid,
) -> RosterResult<Option<PriorTeam>> {
    let team = match tx.lock_team_row(team_id).await {
        Ok(team) => team,
        Err(RepositoryError::NotFound) => {
            tracing::warn!(%team_id, "User references an inactive team, treating as unassigned");
            return Ok(None);
        }
        Err(e) => return Err(RosterError::store("lock prior team row")(e)),
    };
    let members = tx
        .get_users_by_team(team.id)
        .await
        .map_err(RosterError::store("load prior team members"))?;
    Ok(Some(PriorTeam { team, members }))
}

/// Score the actor would lose by discarding the prior team
pub(super) async fn preview_cleanup(
    tx: &mut dyn RosterTransaction,
    prior: &PriorTeam,
) -> RosterResult<AffectedData> {
    let score = tx
        .get_team_score(prior.team.id)
        .await
        .map_err(RosterError::store("read solo team score"))?;
    Ok(score.into())
}

impl TeamRosterEngine {
    /// Discard an eligible prior team: soft delete, purge solves, audit.
    pub(super) async fn execute_solo_cleanup(
        &self,
        tx: &mut dyn RosterTransaction,
        prior: &PriorTeam,
        actor_id: Uuid,
    ) -> RosterResult<()> {
        tx.soft_delete_team(prior.team.id)
            .await
            .map_err(RosterError::store("soft delete solo team"))?;

        let removed = tx
            .delete_solves_by_team(prior.team.id)
            .await
            .map_err(RosterError::store("delete solo team solves"))?;

        let entry = TeamAuditEntry::new(prior.team.id, actor_id, TeamAuditAction::Deleted)
            .with_details(json!({
                "reason": "solo_team_cleanup",
                "solves_removed": removed,
            }));
        self.record(tx, entry).await?;

        tracing::debug!(
            team_id = %prior.team.id,
            user_id = %actor_id,
            solves_removed = removed,
            "Solo team discarded"
        );
        Ok(())
    }
}
