//! `schema_migrations` ledger: each migration runs and is recorded in one transaction.
use std::time::Instant;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::domain::migration::{AppliedMigration, Migration};
use crate::ports::ledger::{ApplyOutcome, MigrationLedger};

const LEDGER_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/res/sql/postgres/ledger.sql"
));

/// Advisory lock shared by every bootstrap runner against the same database.
const MIGRATION_LOCK_KEY: i64 = 0x6462_626f_6f74;

pub struct PgMigrationLedger {
    pool: PgPool,
}

impl PgMigrationLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MigrationLedger for PgMigrationLedger {
    async fn ensure(&self) -> Result<(), String> {
        // Serialised, since concurrent CREATE TABLE IF NOT EXISTS can still collide.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| format!("ledger begin error: {e}"))?;
        lock(&mut tx).await?;
        sqlx::query(LEDGER_SCHEMA)
            .execute(&mut *tx)
            .await
            .map_err(|e| format!("ledger create error: {e}"))?;
        tx.commit()
            .await
            .map_err(|e| format!("ledger commit error: {e}"))?;
        debug!("Ledger table ready");
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>, String> {
        let rows = match sqlx::query(
            "SELECT version, name, checksum, applied_at, execution_ms \
             FROM schema_migrations ORDER BY version",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) if is_missing_table_error(&e) => return Ok(Vec::new()),
            Err(e) => return Err(format!("ledger read error: {e}")),
        };

        rows.into_iter()
            .map(|row| -> Result<AppliedMigration, String> {
                let applied_at: DateTime<Utc> = row
                    .try_get("applied_at")
                    .map_err(|e| format!("ledger row error: {e}"))?;
                Ok(AppliedMigration {
                    version: row
                        .try_get("version")
                        .map_err(|e| format!("ledger row error: {e}"))?,
                    name: row
                        .try_get("name")
                        .map_err(|e| format!("ledger row error: {e}"))?,
                    checksum: row
                        .try_get("checksum")
                        .map_err(|e| format!("ledger row error: {e}"))?,
                    applied_at: Some(applied_at),
                    execution_ms: row
                        .try_get("execution_ms")
                        .map_err(|e| format!("ledger row error: {e}"))?,
                })
            })
            .collect()
    }

    async fn apply(&self, migration: &Migration) -> Result<ApplyOutcome, String> {
        let version = migration.version;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| format!("migrate begin error (version {version}): {e}"))?;
        lock(&mut tx).await?;

        // Re-check under the lock: another runner may have got here first.
        let recorded: Option<i64> =
            sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = $1")
                .bind(version)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| format!("ledger read error (version {version}): {e}"))?;
        if recorded.is_some() {
            info!(version, "Version already recorded under lock");
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let started = Instant::now();
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&migration.sql))
            .await
            .map_err(|e| format!("migrate error (version {version}): {e}"))?;
        let execution_ms = started.elapsed().as_millis() as i64;

        sqlx::query(
            "INSERT INTO schema_migrations (version, name, checksum, execution_ms) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(version)
        .bind(&migration.name)
        .bind(&migration.checksum)
        .bind(execution_ms)
        .execute(&mut *tx)
        .await
        .map_err(|e| format!("ledger insert error (version {version}): {e}"))?;

        tx.commit()
            .await
            .map_err(|e| format!("migrate commit error (version {version}): {e}"))?;
        Ok(ApplyOutcome::Applied { execution_ms })
    }
}

async fn lock(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>) -> Result<(), String> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut **tx)
        .await
        .map_err(|e| format!("migration lock error: {e}"))?;
    Ok(())
}

fn is_missing_table_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("42P01")
    )
}
