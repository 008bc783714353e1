//! CTFBoard application composition root
//!
//! Wires the Postgres adapters into the team roster engine and sets up
//! process-wide logging.

pub mod cli;

use std::sync::Arc;

use ctfboard_common::{Config, Error as AppError, LogFormat, Result};
use ctfboard_teams::{
    CompetitionGuard, NoopScoreboardCache, RosterConfig, RosterDependencies,
    ScoreboardCacheInvalidator, TeamRosterEngine, TeamsRepositories, TransactionalAuditSink,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .init(),
    }
}

pub async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Apply pending schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(())
}

/// Roster engine over Postgres with no scoreboard cache
pub fn build_engine(pool: PgPool, roster: RosterConfig) -> TeamRosterEngine {
    build_engine_with_cache(pool, roster, Arc::new(NoopScoreboardCache))
}

pub fn build_engine_with_cache(
    pool: PgPool,
    roster: RosterConfig,
    cache: Arc<dyn ScoreboardCacheInvalidator>,
) -> TeamRosterEngine {
    let repos = TeamsRepositories::new(pool);

    let deps = RosterDependencies {
        unit_of_work: Arc::new(repos.unit_of_work),
        users: Arc::new(repos.users),
        teams: Arc::new(repos.teams),
        guard: Arc::new(CompetitionGuard::new(Arc::new(repos.policy))),
        audit: Arc::new(TransactionalAuditSink::new()),
        cache,
    };

    TeamRosterEngine::new(deps, roster)
}
