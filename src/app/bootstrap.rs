use tracing::{debug, error, info, warn};

use crate::app::context::BootstrapContext;
use crate::app::error::BootstrapError;
use crate::domain::migration::plan;
use crate::domain::phase::{BootstrapPhase, PhaseEvent};
use crate::ports::{
    ledger::{ApplyOutcome, MigrationLedger},
    probe::ReadinessProbe,
    sleeper::Sleeper,
    source::MigrationSource,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    /// Recorded by a concurrent runner between planning and applying.
    pub skipped: Vec<i64>,
    pub already_applied: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub attempts: u32,
    pub migrations: MigrationReport,
}

pub struct Bootstrapper;

impl Bootstrapper {
    /// Full bootstrap: wait for the database, then apply pending migrations.
    /// Every failure is logged once at `error` before it is returned.
    pub async fn run<P, L, M, S>(
        ctx: &BootstrapContext<P, L, M, S>,
    ) -> Result<BootstrapReport, BootstrapError>
    where
        P: ReadinessProbe,
        L: MigrationLedger,
        M: MigrationSource,
        S: Sleeper,
    {
        let mut phase = BootstrapPhase::initial();
        info!(
            phase = phase.as_str(),
            max_attempts = ctx.retry.max_attempts(),
            interval_ms = ctx.retry.interval.as_millis() as u64,
            max_wait_ms = ctx.retry.total_sleep().as_millis() as u64,
            "Bootstrap start"
        );

        let attempts = match Self::wait_for_database(ctx).await {
            Ok(attempts) => {
                phase = transition(phase, PhaseEvent::ProbeSucceeded);
                attempts
            }
            Err(e) => {
                transition(phase, PhaseEvent::AttemptsExhausted);
                return Err(e);
            }
        };

        let migrations = match Self::apply_migrations(ctx).await {
            Ok(report) => {
                phase = transition(phase, PhaseEvent::MigrationsApplied);
                report
            }
            Err(e) => {
                transition(phase, PhaseEvent::MigrationFailed);
                return Err(e);
            }
        };

        info!(
            phase = phase.as_str(),
            attempts,
            applied = migrations.applied.len(),
            already_applied = migrations.already_applied,
            "Bootstrap done"
        );
        Ok(BootstrapReport {
            attempts,
            migrations,
        })
    }

    /// Linear polling: at most `max_attempts` probes, `interval` apart, no
    /// sleep after the last one. Returns the attempt that succeeded.
    pub async fn wait_for_database<P, L, M, S>(
        ctx: &BootstrapContext<P, L, M, S>,
    ) -> Result<u32, BootstrapError>
    where
        P: ReadinessProbe,
        L: MigrationLedger,
        M: MigrationSource,
        S: Sleeper,
    {
        let max_attempts = ctx.retry.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match ctx.probe.check().await {
                Ok(()) => {
                    info!(attempt, max_attempts, "Database is ready");
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Database not ready");
                    last_error = e;
                }
            }
            if attempt < max_attempts {
                ctx.sleeper.sleep(ctx.retry.interval).await;
            }
        }

        error!(
            attempts = max_attempts,
            error = %last_error,
            "Database unavailable, retry budget exhausted"
        );
        Err(BootstrapError::ConnectionUnavailable {
            attempts: max_attempts,
            last_error,
        })
    }

    /// Loads, plans and applies migrations in version order. Not retried:
    /// the first failure stops the run.
    pub async fn apply_migrations<P, L, M, S>(
        ctx: &BootstrapContext<P, L, M, S>,
    ) -> Result<MigrationReport, BootstrapError>
    where
        P: ReadinessProbe,
        L: MigrationLedger,
        M: MigrationSource,
        S: Sleeper,
    {
        let available = ctx.source.load().await.map_err(|e| migration_failed(None, e))?;
        ctx.ledger.ensure().await.map_err(|e| migration_failed(None, e))?;
        let applied = ctx.ledger.applied().await.map_err(|e| migration_failed(None, e))?;

        let plan = plan(&available, &applied)
            .map_err(|e| migration_failed(Some(e.version()), e.to_string()))?;

        for version in &plan.unknown_applied {
            warn!(version, "Ledger has a migration with no file on disk");
        }

        let mut report = MigrationReport {
            already_applied: plan.already_applied,
            ..MigrationReport::default()
        };

        if plan.is_up_to_date() {
            info!(
                available = available.len(),
                already_applied = plan.already_applied,
                "Schema is up to date"
            );
            return Ok(report);
        }

        info!(
            pending = plan.pending.len(),
            already_applied = plan.already_applied,
            "Applying migrations"
        );
        for m in &plan.pending {
            debug!(version = m.version, name = %m.name, checksum = %m.checksum, "Applying migration");
            match ctx.ledger.apply(m).await {
                Ok(ApplyOutcome::Applied { execution_ms }) => {
                    info!(version = m.version, name = %m.name, execution_ms, "Migration applied");
                    report.applied.push(m.version);
                }
                Ok(ApplyOutcome::AlreadyApplied) => {
                    info!(version = m.version, name = %m.name, "Migration applied by another runner, skipping");
                    report.skipped.push(m.version);
                }
                Err(e) => return Err(migration_failed(Some(m.version), e)),
            }
        }

        Ok(report)
    }
}

fn transition(phase: BootstrapPhase, event: PhaseEvent) -> BootstrapPhase {
    let next = phase.on(event).unwrap_or(phase);
    debug!(from = phase.as_str(), to = next.as_str(), ?event, "Phase transition");
    next
}

fn migration_failed(version: Option<i64>, reason: String) -> BootstrapError {
    error!(version, error = %reason, "Migration failed");
    BootstrapError::MigrationFailure { version, reason }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::app::test_support::*;
    use crate::domain::migration::Migration;

    const TWO_SECS: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn never_ready_probes_exactly_n_times() {
        for n in [1u32, 2, 5, 30] {
            let ctx = context(n, TWO_SECS, ScriptedProbe::never(), MemoryLedger::default(), vec![]);
            let err = Bootstrapper::run(&ctx).await.unwrap_err();

            assert_eq!(ctx.probe.calls(), n);
            assert_eq!(ctx.sleeper.sleeps(), vec![TWO_SECS; (n - 1) as usize]);
            assert_eq!(err.exit_code(), 1);
            assert!(matches!(
                err,
                BootstrapError::ConnectionUnavailable { attempts, .. } if attempts == n
            ));
            assert!(ctx.ledger.executed().is_empty());
        }
    }

    #[tokio::test]
    async fn stops_probing_at_first_success() {
        let ctx = context(
            30,
            TWO_SECS,
            ScriptedProbe::ready_on(4),
            MemoryLedger::default(),
            sample_migrations(),
        );
        let report = Bootstrapper::run(&ctx).await.unwrap();

        assert_eq!(report.attempts, 4);
        assert_eq!(ctx.probe.calls(), 4);
        assert_eq!(ctx.sleeper.sleeps().len(), 3);
        assert_eq!(report.migrations.applied, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn single_attempt_budget_never_retries() {
        let ok = context(1, TWO_SECS, ScriptedProbe::ready_on(1), MemoryLedger::default(), vec![]);
        assert_eq!(Bootstrapper::run(&ok).await.unwrap().attempts, 1);
        assert_eq!(ok.probe.calls(), 1);
        assert!(ok.sleeper.sleeps().is_empty());

        let down = context(1, TWO_SECS, ScriptedProbe::ready_on(2), MemoryLedger::default(), vec![]);
        assert!(Bootstrapper::run(&down).await.is_err());
        assert_eq!(down.probe.calls(), 1);
        assert!(down.sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn ready_on_last_attempt_succeeds() {
        let ctx = context(3, TWO_SECS, ScriptedProbe::ready_on(3), MemoryLedger::default(), vec![]);
        let report = Bootstrapper::run(&ctx).await.unwrap();
        assert_eq!(report.attempts, 3);
        assert_eq!(ctx.sleeper.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn rerun_on_migrated_database_is_a_no_op() {
        let migrations = sample_migrations();
        let ctx = context(
            30,
            TWO_SECS,
            ScriptedProbe::ready_on(1),
            MemoryLedger::with_applied(&migrations),
            migrations,
        );
        let report = Bootstrapper::run(&ctx).await.unwrap();

        assert!(report.migrations.applied.is_empty());
        assert_eq!(report.migrations.already_applied, 3);
        assert!(ctx.ledger.executed().is_empty());
        assert_eq!(ctx.ledger.versions(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn running_twice_applies_once() {
        let ctx = context(
            30,
            TWO_SECS,
            ScriptedProbe::ready_on(1),
            MemoryLedger::default(),
            sample_migrations(),
        );
        Bootstrapper::run(&ctx).await.unwrap();
        let second = Bootstrapper::run(&ctx).await.unwrap();

        assert!(second.migrations.applied.is_empty());
        assert_eq!(ctx.ledger.executed(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn only_pending_migrations_run() {
        let migrations = sample_migrations();
        let ctx = context(
            30,
            TWO_SECS,
            ScriptedProbe::ready_on(1),
            MemoryLedger::with_applied(&migrations[..1]),
            migrations,
        );
        let report = Bootstrapper::run(&ctx).await.unwrap();
        assert_eq!(report.migrations.applied, vec![2, 3]);
        assert_eq!(report.migrations.already_applied, 1);
    }

    #[tokio::test]
    async fn failing_migration_exits_two_and_is_not_recorded() {
        let ledger = MemoryLedger {
            fail_on: Some(2),
            ..MemoryLedger::default()
        };
        let ctx = context(30, TWO_SECS, ScriptedProbe::ready_on(1), ledger, sample_migrations());
        let err = Bootstrapper::run(&ctx).await.unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(matches!(
            err,
            BootstrapError::MigrationFailure { version: Some(2), .. }
        ));
        assert_eq!(ctx.ledger.versions(), vec![1]);
        // Stops at the failure; version 3 is never attempted.
        assert_eq!(ctx.ledger.executed(), vec![1]);
        assert_eq!(ctx.probe.calls(), 1);
    }

    #[tokio::test]
    async fn unreadable_source_is_a_migration_failure() {
        let mut ctx = context(5, TWO_SECS, ScriptedProbe::ready_on(1), MemoryLedger::default(), vec![]);
        ctx.source = MemorySource(Err("migrations dir 'migrations' not found".into()));
        let err = Bootstrapper::run(&ctx).await.unwrap_err();
        assert!(matches!(err, BootstrapError::MigrationFailure { version: None, .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn edited_migration_blocks_the_run() {
        let applied = sample_migrations();
        let mut on_disk = applied.clone();
        on_disk[1] = Migration::new(2, "add_email", "ALTER TABLE accounts ADD COLUMN email VARCHAR(255)");
        let ctx = context(
            30,
            TWO_SECS,
            ScriptedProbe::ready_on(1),
            MemoryLedger::with_applied(&applied[..2]),
            on_disk,
        );
        let err = Bootstrapper::run(&ctx).await.unwrap_err();
        assert!(matches!(err, BootstrapError::MigrationFailure { version: Some(2), .. }));
        assert!(ctx.ledger.executed().is_empty());
    }

    #[tokio::test]
    async fn concurrent_runner_win_is_a_skip() {
        let ledger = MemoryLedger {
            raced: vec![2],
            ..MemoryLedger::default()
        };
        let ctx = context(30, TWO_SECS, ScriptedProbe::ready_on(1), ledger, sample_migrations());
        let report = Bootstrapper::run(&ctx).await.unwrap();
        assert_eq!(report.migrations.applied, vec![1, 3]);
        assert_eq!(report.migrations.skipped, vec![2]);
    }

    #[tokio::test]
    async fn unreachable_logs_one_warning_per_attempt_then_one_error() {
        let recorder = LevelRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let ctx = context(3, Duration::ZERO, ScriptedProbe::never(), MemoryLedger::default(), vec![]);
        let err = Bootstrapper::run(&ctx).await.unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert_eq!(recorder.count(Level::WARN), 3);
        assert_eq!(recorder.count(Level::ERROR), 1);
        let last_problem = recorder
            .levels()
            .into_iter()
            .filter(|l| *l <= Level::WARN)
            .last();
        assert_eq!(last_problem, Some(Level::ERROR));
    }
}
