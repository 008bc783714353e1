//! In-memory roster store
//!
//! Implements every repository trait over a single mutex-guarded snapshot. A
//! transaction takes the store lock for its whole lifetime and works on a
//! copy, so transactions are fully serialized; commit publishes the copy and
//! drop discards it.

use async_trait::async_trait;
use chrono::Utc;
use ctfboard_common::RepositoryError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::entities::{Solve, Team, TeamAuditEntry, TeamScore, User};
use crate::repository::teams::TeamRepository;
use crate::repository::transactions::{RosterTransaction, UnitOfWork};
use crate::repository::users::UserRepository;

type RepoResult<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, Clone, Default)]
struct RosterData {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    solves: Vec<Solve>,
    audit: Vec<TeamAuditEntry>,
}

impl RosterData {
    fn active_team(&self, team_id: Uuid) -> Option<&Team> {
        self.teams.get(&team_id).filter(|t| t.is_active())
    }

    fn active_team_mut(&mut self, team_id: Uuid) -> RepoResult<&mut Team> {
        self.teams
            .get_mut(&team_id)
            .filter(|t| t.is_active())
            .ok_or(RepositoryError::NotFound)
    }

    fn members(&self, team_id: Uuid) -> Vec<User> {
        let mut members: Vec<User> = self
            .users
            .values()
            .filter(|u| u.is_member_of(team_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        members
    }

    fn score(&self, team_id: Uuid) -> TeamScore {
        self.solves
            .iter()
            .filter(|s| s.team_id == team_id)
            .fold(TeamScore::default(), |acc, s| TeamScore {
                solve_count: acc.solve_count + 1,
                points: acc.points + s.points,
            })
    }

    fn audit_for(&self, team_id: Uuid) -> Vec<TeamAuditEntry> {
        self.audit
            .iter()
            .filter(|e| e.team_id == team_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
struct Faults {
    audit_writes: AtomicBool,
    solve_purge: AtomicBool,
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Connection(sqlx::Error::PoolTimedOut)
}

#[derive(Clone, Default)]
pub struct InMemoryRosterStore {
    data: Arc<Mutex<RosterData>>,
    faults: Arc<Faults>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) -> User {
        self.data.lock().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn insert_team(&self, team: Team) -> Team {
        self.data.lock().await.teams.insert(team.id, team.clone());
        team
    }

    pub async fn record_solve(&self, solve: Solve) {
        self.data.lock().await.solves.push(solve);
    }

    pub async fn user(&self, user_id: Uuid) -> Option<User> {
        self.data.lock().await.users.get(&user_id).cloned()
    }

    /// Team by ID, including soft-deleted ones
    pub async fn team(&self, team_id: Uuid) -> Option<Team> {
        self.data.lock().await.teams.get(&team_id).cloned()
    }

    pub async fn active_team_by_name(&self, name: &str) -> Option<Team> {
        self.data
            .lock()
            .await
            .teams
            .values()
            .find(|t| t.is_active() && t.name == name)
            .cloned()
    }

    pub async fn all_users(&self) -> Vec<User> {
        self.data.lock().await.users.values().cloned().collect()
    }

    /// Every team, including soft-deleted ones
    pub async fn all_teams(&self) -> Vec<Team> {
        self.data.lock().await.teams.values().cloned().collect()
    }

    pub async fn members(&self, team_id: Uuid) -> Vec<User> {
        self.data.lock().await.members(team_id)
    }

    pub async fn score(&self, team_id: Uuid) -> TeamScore {
        self.data.lock().await.score(team_id)
    }

    pub async fn audit_log(&self) -> Vec<TeamAuditEntry> {
        self.data.lock().await.audit.clone()
    }

    pub async fn audit_for(&self, team_id: Uuid) -> Vec<TeamAuditEntry> {
        self.data.lock().await.audit_for(team_id)
    }

    /// Make every audit write fail until reset
    pub fn fail_audit_writes(&self, fail: bool) {
        self.faults.audit_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every solve purge fail until reset
    pub fn fail_solve_purge(&self, fail: bool) {
        self.faults.solve_purge.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UnitOfWork for InMemoryRosterStore {
    async fn begin(&self) -> RepoResult<Box<dyn RosterTransaction>> {
        let guard = self.data.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<RosterData>,
    working: RosterData,
    faults: Arc<Faults>,
}

#[async_trait]
impl RosterTransaction for InMemoryTransaction {
    async fn lock_user_row(&mut self, user_id: Uuid) -> RepoResult<User> {
        self.working
            .users
            .get(&user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn lock_team_row(&mut self, team_id: Uuid) -> RepoResult<Team> {
        self.working
            .active_team(team_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_user_by_id(&mut self, user_id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn get_team_by_name(&mut self, name: &str) -> RepoResult<Option<Team>> {
        Ok(self
            .working
            .teams
            .values()
            .find(|t| t.is_active() && t.name == name)
            .cloned())
    }

    async fn get_team_by_id(&mut self, team_id: Uuid) -> RepoResult<Option<Team>> {
        Ok(self.working.active_team(team_id).cloned())
    }

    async fn get_team_by_invite_token(&mut self, token: Uuid) -> RepoResult<Option<Team>> {
        if token.is_nil() {
            return Ok(None);
        }
        Ok(self
            .working
            .teams
            .values()
            .find(|t| t.is_active() && t.invite_token == token)
            .cloned())
    }

    async fn get_users_by_team(&mut self, team_id: Uuid) -> RepoResult<Vec<User>> {
        Ok(self.working.members(team_id))
    }

    async fn get_team_score(&mut self, team_id: Uuid) -> RepoResult<TeamScore> {
        Ok(self.working.score(team_id))
    }

    async fn create_team(&mut self, team: &Team) -> RepoResult<Team> {
        let clash = self.working.teams.contains_key(&team.id)
            || self
                .working
                .teams
                .values()
                .any(|t| t.is_active() && t.name == team.name);
        if clash {
            return Err(RepositoryError::AlreadyExists);
        }
        self.working.teams.insert(team.id, team.clone());
        Ok(team.clone())
    }

    async fn update_user_team(&mut self, user_id: Uuid, team_id: Option<Uuid>) -> RepoResult<()> {
        let user = self
            .working
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;
        user.team_id = team_id;
        Ok(())
    }

    async fn update_team_captain(&mut self, team_id: Uuid, captain_id: Uuid) -> RepoResult<()> {
        self.working.active_team_mut(team_id)?.captain_id = captain_id;
        Ok(())
    }

    async fn update_team_invite_token(&mut self, team_id: Uuid, token: Uuid) -> RepoResult<()> {
        self.working.active_team_mut(team_id)?.invite_token = token;
        Ok(())
    }

    async fn soft_delete_team(&mut self, team_id: Uuid) -> RepoResult<()> {
        self.working.active_team_mut(team_id)?.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_solves_by_team(&mut self, team_id: Uuid) -> RepoResult<u64> {
        if self.faults.solve_purge.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        let before = self.working.solves.len();
        self.working.solves.retain(|s| s.team_id != team_id);
        Ok((before - self.working.solves.len()) as u64)
    }

    async fn create_audit_entry(&mut self, entry: &TeamAuditEntry) -> RepoResult<()> {
        if self.faults.audit_writes.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }
        self.working.audit.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRosterStore {
    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.user(id).await)
    }

    async fn get_by_team(&self, team_id: Uuid) -> RepoResult<Vec<User>> {
        Ok(self.members(team_id).await)
    }
}

#[async_trait]
impl TeamRepository for InMemoryRosterStore {
    async fn get_by_id(&self, team_id: Uuid) -> RepoResult<Option<Team>> {
        Ok(self.data.lock().await.active_team(team_id).cloned())
    }

    async fn ban(&self, team_id: Uuid, reason: &str) -> RepoResult<Team> {
        let mut data = self.data.lock().await;
        let team = data.active_team_mut(team_id)?;
        team.is_banned = true;
        team.banned_at = Some(Utc::now());
        team.banned_reason = Some(reason.to_string());
        Ok(team.clone())
    }

    async fn unban(&self, team_id: Uuid) -> RepoResult<Team> {
        let mut data = self.data.lock().await;
        let team = data.active_team_mut(team_id)?;
        team.is_banned = false;
        team.banned_at = None;
        team.banned_reason = None;
        Ok(team.clone())
    }

    async fn set_hidden(&self, team_id: Uuid, hidden: bool) -> RepoResult<Team> {
        let mut data = self.data.lock().await;
        let team = data.active_team_mut(team_id)?;
        team.is_hidden = hidden;
        Ok(team.clone())
    }

    async fn set_bracket(&self, team_id: Uuid, bracket_id: Option<Uuid>) -> RepoResult<Team> {
        let mut data = self.data.lock().await;
        let team = data.active_team_mut(team_id)?;
        team.bracket_id = bracket_id;
        Ok(team.clone())
    }

    async fn audit_history(&self, team_id: Uuid) -> RepoResult<Vec<TeamAuditEntry>> {
        Ok(self.audit_for(team_id).await)
    }
}
