//! Repository implementations for the teams domain

pub mod competitions;
pub mod memory;
pub mod teams;
pub mod transactions;
pub mod users;

use sqlx::PgPool;

pub use competitions::{PgPolicySource, PolicySource, StaticPolicySource};
pub use memory::{InMemoryRosterStore, InMemoryTransaction};
pub use teams::{PgTeamRepository, TeamRepository};
pub use transactions::{PgRosterTransaction, PgUnitOfWork, RosterTransaction, UnitOfWork};
pub use users::{PgUserRepository, UserRepository};

/// Combined Postgres repository access for the teams domain
#[derive(Clone)]
pub struct TeamsRepositories {
    pub unit_of_work: PgUnitOfWork,
    pub users: PgUserRepository,
    pub teams: PgTeamRepository,
    pub policy: PgPolicySource,
}

impl TeamsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            unit_of_work: PgUnitOfWork::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            teams: PgTeamRepository::new(pool.clone()),
            policy: PgPolicySource::new(pool),
        }
    }
}
