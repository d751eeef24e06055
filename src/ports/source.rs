//! Where migrations come from.
use crate::domain::migration::Migration;

#[async_trait::async_trait]
pub trait MigrationSource: Send + Sync {
    /// Migrations sorted by ascending version, duplicates rejected.
    async fn load(&self) -> Result<Vec<Migration>, String>;
}
