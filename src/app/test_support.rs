//! In-memory port implementations shared by the app-layer tests.
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::app::context::BootstrapContext;
use crate::domain::migration::{AppliedMigration, Migration};
use crate::domain::model::RetryPolicy;
use crate::ports::{
    ledger::{ApplyOutcome, MigrationLedger},
    probe::ReadinessProbe,
    sleeper::Sleeper,
    source::MigrationSource,
};

/// Fails until the `ready_on`-th call, then succeeds. `None` never succeeds.
pub struct ScriptedProbe {
    ready_on: Option<u32>,
    calls: AtomicU32,
}

impl ScriptedProbe {
    pub fn ready_on(attempt: u32) -> Self {
        Self {
            ready_on: Some(attempt),
            calls: AtomicU32::new(0),
        }
    }

    pub fn never() -> Self {
        Self {
            ready_on: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReadinessProbe for ScriptedProbe {
    async fn check(&self) -> Result<(), String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.ready_on {
            Some(k) if n >= k => Ok(()),
            _ => Err("connection refused".to_string()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub struct MemorySource(pub Result<Vec<Migration>, String>);

#[async_trait::async_trait]
impl MigrationSource for MemorySource {
    async fn load(&self) -> Result<Vec<Migration>, String> {
        self.0.clone()
    }
}

/// Ledger kept in memory. `fail_on` makes `apply` of that version fail
/// without recording it, the way a rolled-back transaction would.
#[derive(Default)]
pub struct MemoryLedger {
    pub rows: Mutex<Vec<AppliedMigration>>,
    pub executed: Mutex<Vec<i64>>,
    pub fail_on: Option<i64>,
    /// Versions a "concurrent runner" records between planning and applying.
    pub raced: Vec<i64>,
}

impl MemoryLedger {
    pub fn with_applied(migrations: &[Migration]) -> Self {
        let rows = migrations
            .iter()
            .map(|m| AppliedMigration {
                version: m.version,
                name: m.name.clone(),
                checksum: m.checksum.clone(),
                applied_at: None,
                execution_ms: 0,
            })
            .collect();
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn versions(&self) -> Vec<i64> {
        self.rows.lock().unwrap().iter().map(|r| r.version).collect()
    }

    pub fn executed(&self) -> Vec<i64> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MigrationLedger for MemoryLedger {
    async fn ensure(&self) -> Result<(), String> {
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>, String> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn apply(&self, migration: &Migration) -> Result<ApplyOutcome, String> {
        if self.raced.contains(&migration.version) {
            return Ok(ApplyOutcome::AlreadyApplied);
        }
        if self.fail_on == Some(migration.version) {
            return Err(format!(
                "migrate error (version {}): syntax error at or near \"TABEL\"",
                migration.version
            ));
        }
        self.executed.lock().unwrap().push(migration.version);
        self.rows.lock().unwrap().push(AppliedMigration {
            version: migration.version,
            name: migration.name.clone(),
            checksum: migration.checksum.clone(),
            applied_at: None,
            execution_ms: 3,
        });
        Ok(ApplyOutcome::Applied { execution_ms: 3 })
    }
}

pub type TestContext = BootstrapContext<ScriptedProbe, MemoryLedger, MemorySource, RecordingSleeper>;

pub fn context(
    max_attempts: u32,
    interval: Duration,
    probe: ScriptedProbe,
    ledger: MemoryLedger,
    migrations: Vec<Migration>,
) -> TestContext {
    BootstrapContext {
        retry: RetryPolicy::new(max_attempts, interval),
        probe,
        ledger,
        source: MemorySource(Ok(migrations)),
        sleeper: RecordingSleeper::default(),
    }
}

pub fn sample_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_accounts", "CREATE TABLE accounts(id BIGSERIAL PRIMARY KEY)"),
        Migration::new(2, "add_email", "ALTER TABLE accounts ADD COLUMN email TEXT"),
        Migration::new(3, "index_email", "CREATE INDEX idx_accounts_email ON accounts(email)"),
    ]
}

/// Records the level of every event it sees.
#[derive(Clone, Default)]
pub struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

impl LevelRecorder {
    pub fn count(&self, level: Level) -> usize {
        self.0.lock().unwrap().iter().filter(|l| **l == level).count()
    }

    pub fn levels(&self) -> Vec<Level> {
        self.0.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for LevelRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(*event.metadata().level());
    }
}
