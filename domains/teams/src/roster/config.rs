use anyhow::Result;
use std::env;

use crate::domain::entities::DEFAULT_MAX_TEAM_SIZE;

/// Roster engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterConfig {
    /// Upper bound on members per team
    pub max_team_size: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            max_team_size: DEFAULT_MAX_TEAM_SIZE,
        }
    }
}

impl RosterConfig {
    pub fn new(max_team_size: usize) -> Result<Self> {
        if max_team_size == 0 {
            anyhow::bail!("ROSTER_MAX_TEAM_SIZE must be at least 1");
        }
        Ok(Self { max_team_size })
    }

    /// Load from `ROSTER_MAX_TEAM_SIZE`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("ROSTER_MAX_TEAM_SIZE") {
            Some(raw) => {
                let size = raw.trim().parse::<usize>().map_err(|e| {
                    anyhow::anyhow!("Invalid ROSTER_MAX_TEAM_SIZE {:?}: {}", raw, e)
                })?;
                Self::new(size)
            }
            None => Ok(Self::default()),
        }
    }
}
