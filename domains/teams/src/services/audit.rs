//! Team audit sink

use async_trait::async_trait;
use ctfboard_common::RepositoryError;

use crate::domain::entities::TeamAuditEntry;
use crate::repository::transactions::RosterTransaction;

/// Durably records roster mutations.
///
/// Entries are written through the operation's own transaction, so a failed
/// audit write rolls back the mutation it describes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        tx: &mut dyn RosterTransaction,
        entry: TeamAuditEntry,
    ) -> Result<(), RepositoryError>;
}

/// Writes entries to the team audit log table
#[derive(Debug, Clone, Default)]
pub struct TransactionalAuditSink;

impl TransactionalAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TransactionalAuditSink {
    async fn record(
        &self,
        tx: &mut dyn RosterTransaction,
        entry: TeamAuditEntry,
    ) -> Result<(), RepositoryError> {
        tx.create_audit_entry(&entry).await?;
        tracing::debug!(
            team_id = %entry.team_id,
            user_id = %entry.user_id,
            action = %entry.action,
            "Team audit entry recorded"
        );
        Ok(())
    }
}
