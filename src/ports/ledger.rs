//! Version ledger that records which migrations have been applied.
use crate::domain::migration::{AppliedMigration, Migration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { execution_ms: i64 },
    /// Another runner recorded this version first.
    AlreadyApplied,
}

#[async_trait::async_trait]
pub trait MigrationLedger: Send + Sync {
    /// Creates the ledger table if missing.
    async fn ensure(&self) -> Result<(), String>;

    async fn applied(&self) -> Result<Vec<AppliedMigration>, String>;

    /// Runs the migration and records it atomically: either both happen or neither.
    async fn apply(&self, migration: &Migration) -> Result<ApplyOutcome, String>;
}
