//! Founding teams: create, try_create, confirm_create, create_solo_team

use ctfboard_common::RepositoryError;
use serde_json::json;
use uuid::Uuid;

use super::solo::{load_prior_team, preview_cleanup, validate_solo_cleanup, PriorTeam};
use super::{lock_user, TeamRosterEngine};
use crate::domain::entities::{Team, TeamAuditAction, TeamAuditEntry, User, MAX_TEAM_NAME_LEN};
use crate::domain::errors::{RosterError, RosterResult};
use crate::domain::outcome::{ConfirmationReason, OperationResult};
use crate::repository::transactions::RosterTransaction;

/// Locked state for founding a team
#[derive(Debug)]
pub(super) struct CreateSnapshot {
    pub founder: User,
    pub name_taken: bool,
    pub prior: Option<PriorTeam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CreatePlan {
    Fresh,
    ReplaceSolo,
}

pub(super) fn validate_create(
    snapshot: &CreateSnapshot,
    confirm_reset: bool,
) -> RosterResult<CreatePlan> {
    if snapshot.name_taken {
        return Err(RosterError::TeamAlreadyExists);
    }
    validate_replacement(snapshot.prior.as_ref(), snapshot.founder.id, confirm_reset)
}

fn validate_replacement(
    prior: Option<&PriorTeam>,
    founder_id: Uuid,
    confirm_reset: bool,
) -> RosterResult<CreatePlan> {
    match prior {
        None => Ok(CreatePlan::Fresh),
        Some(prior) => {
            validate_solo_cleanup(prior, founder_id, confirm_reset)?;
            Ok(CreatePlan::ReplaceSolo)
        }
    }
}

/// Candidate names for a user's solo team, in order of preference.
///
/// Long usernames are cut so that every candidate, suffix included, fits
/// within [`MAX_TEAM_NAME_LEN`].
pub(super) fn solo_team_names(user: &User) -> [String; 3] {
    let short_id: String = user.id.simple().to_string().chars().take(8).collect();
    let with_suffix = |suffix: String| {
        let room = MAX_TEAM_NAME_LEN - suffix.chars().count();
        let base: String = user.username.trim().chars().take(room).collect();
        format!("{}{}", base.trim_end(), suffix)
    };
    [
        with_suffix(String::new()),
        with_suffix(" (Solo)".to_string()),
        with_suffix(format!(" (Solo {})", short_id)),
    ]
}

fn map_create_conflict(source: RepositoryError) -> RosterError {
    match source {
        RepositoryError::AlreadyExists => RosterError::TeamAlreadyExists,
        source => RosterError::Store {
            step: "insert team",
            source,
        },
    }
}

async fn prepare_create(
    tx: &mut dyn RosterTransaction,
    name: &str,
    founder_id: Uuid,
) -> RosterResult<CreateSnapshot> {
    let founder = lock_user(tx, founder_id).await?;

    let name_taken = tx
        .get_team_by_name(name)
        .await
        .map_err(RosterError::store("check team name"))?
        .is_some();

    let prior = match founder.team_id {
        Some(team_id) => load_prior_team(tx, team_id).await?,
        None => None,
    };

    Ok(CreateSnapshot {
        founder,
        name_taken,
        prior,
    })
}

impl TeamRosterEngine {
    /// Found a team with `captain_id` as its captain and only member.
    ///
    /// A captain on an eligible solo team must pass `confirm_reset` to discard it.
    pub async fn create(
        &self,
        name: &str,
        captain_id: Uuid,
        is_solo: bool,
        confirm_reset: bool,
    ) -> RosterResult<Team> {
        let name = Team::validate_name(name)?;
        self.guard.require_team_switch_and_teams_mode().await?;

        let mut tx = self.begin().await?;
        let snapshot = prepare_create(tx.as_mut(), &name, captain_id).await?;
        let plan = validate_create(&snapshot, confirm_reset)?;
        let team = self
            .execute_create(tx.as_mut(), &snapshot, plan, &name, is_solo)
            .await?;
        Self::commit(tx).await?;

        tracing::info!(
            team_id = %team.id,
            captain_id = %captain_id,
            replaced_solo_team = plan == CreatePlan::ReplaceSolo,
            "Team created"
        );
        self.invalidate_all().await;
        Ok(team)
    }

    /// Create a team unless doing so would discard the captain's solo team.
    ///
    /// In that case nothing is written and the result carries a preview of the
    /// solves that `confirm_create` would delete.
    pub async fn try_create(
        &self,
        name: &str,
        captain_id: Uuid,
        is_solo: bool,
    ) -> RosterResult<OperationResult> {
        let name = Team::validate_name(name)?;
        self.guard.require_team_switch_and_teams_mode().await?;

        let mut tx = self.begin().await?;
        let snapshot = prepare_create(tx.as_mut(), &name, captain_id).await?;

        let plan = match validate_create(&snapshot, false) {
            Ok(plan) => plan,
            Err(e) if e.is_confirmation_required() => {
                let Some(prior) = snapshot.prior.as_ref() else {
                    return Err(e);
                };
                let affected = preview_cleanup(tx.as_mut(), prior).await?;
                drop(tx);

                tracing::debug!(
                    captain_id = %captain_id,
                    solo_team_id = %prior.team.id,
                    solve_count = affected.solve_count,
                    points = affected.points,
                    "Team creation needs solo reset confirmation"
                );
                return Ok(OperationResult::needs_confirmation(
                    ConfirmationReason::SoloTeamReset,
                    affected,
                ));
            }
            Err(e) => return Err(e),
        };

        let team = self
            .execute_create(tx.as_mut(), &snapshot, plan, &name, is_solo)
            .await?;
        Self::commit(tx).await?;

        tracing::info!(team_id = %team.id, captain_id = %captain_id, "Team created");
        self.invalidate_all().await;
        Ok(OperationResult::completed(team))
    }

    /// `create` with consent to discard the captain's solo team
    pub async fn confirm_create(
        &self,
        name: &str,
        captain_id: Uuid,
        is_solo: bool,
    ) -> RosterResult<Team> {
        self.create(name, captain_id, is_solo, true).await
    }

    /// Put the user on a fresh solo team named after them.
    pub async fn create_solo_team(&self, user_id: Uuid, confirm_reset: bool) -> RosterResult<Team> {
        self.guard.require_team_switch_and_solo_mode().await?;

        let mut tx = self.begin().await?;
        let user = lock_user(tx.as_mut(), user_id).await?;
        let prior = match user.team_id {
            Some(team_id) => load_prior_team(tx.as_mut(), team_id).await?,
            None => None,
        };
        let plan = validate_replacement(prior.as_ref(), user.id, confirm_reset)?;

        if let (CreatePlan::ReplaceSolo, Some(prior)) = (plan, prior.as_ref()) {
            self.execute_solo_cleanup(tx.as_mut(), prior, user.id)
                .await?;
        }

        let mut chosen = None;
        for candidate in solo_team_names(&user) {
            let Ok(name) = Team::validate_name(&candidate) else {
                continue;
            };
            let taken = tx
                .get_team_by_name(&name)
                .await
                .map_err(RosterError::store("check solo team name"))?
                .is_some();
            if !taken {
                chosen = Some(name);
                break;
            }
        }
        let name = chosen.ok_or(RosterError::TeamAlreadyExists)?;

        let team = Team::new(&name, user.id, true)?;
        let team = tx.create_team(&team).await.map_err(map_create_conflict)?;
        tx.update_user_team(user.id, Some(team.id))
            .await
            .map_err(RosterError::store("assign user to solo team"))?;

        let entry = TeamAuditEntry::new(team.id, user.id, TeamAuditAction::Created)
            .with_details(json!({ "mode": "solo" }));
        self.record(tx.as_mut(), entry).await?;
        Self::commit(tx).await?;

        tracing::info!(team_id = %team.id, user_id = %user.id, name = %team.name, "Solo team created");
        self.invalidate_all().await;
        Ok(team)
    }

    async fn execute_create(
        &self,
        tx: &mut dyn RosterTransaction,
        snapshot: &CreateSnapshot,
        plan: CreatePlan,
        name: &str,
        is_solo: bool,
    ) -> RosterResult<Team> {
        let founder_id = snapshot.founder.id;

        if let (CreatePlan::ReplaceSolo, Some(prior)) = (plan, snapshot.prior.as_ref()) {
            self.execute_solo_cleanup(tx, prior, founder_id).await?;
        }

        let team = Team::new(name, founder_id, is_solo)?;
        let team = tx.create_team(&team).await.map_err(map_create_conflict)?;
        tx.update_user_team(founder_id, Some(team.id))
            .await
            .map_err(RosterError::store("assign captain to team"))?;

        let entry = TeamAuditEntry::new(team.id, founder_id, TeamAuditAction::Created)
            .with_details(json!({ "is_solo": is_solo }));
        self.record(tx, entry).await?;

        Ok(team)
    }
}
