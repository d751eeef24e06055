//! Bootstrap phase machine: WaitingForDb -> ApplyingMigrations -> Done, with one failure per phase.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConnectionUnavailable,
    MigrationFailure,
}

impl FailureKind {
    /// Process exit code the orchestrator sees for this failure.
    pub fn exit_code(self) -> u8 {
        match self {
            FailureKind::ConnectionUnavailable => 1,
            FailureKind::MigrationFailure => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    WaitingForDb,
    ApplyingMigrations,
    Done,
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    ProbeSucceeded,
    AttemptsExhausted,
    MigrationsApplied,
    MigrationFailed,
}

impl BootstrapPhase {
    pub fn initial() -> Self {
        BootstrapPhase::WaitingForDb
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BootstrapPhase::Done | BootstrapPhase::Failed(_))
    }

    /// `None` when the event is not valid in this phase.
    pub fn on(self, event: PhaseEvent) -> Option<BootstrapPhase> {
        use BootstrapPhase::*;
        use PhaseEvent::*;
        match (self, event) {
            (WaitingForDb, ProbeSucceeded) => Some(ApplyingMigrations),
            (WaitingForDb, AttemptsExhausted) => {
                Some(Failed(FailureKind::ConnectionUnavailable))
            }
            (ApplyingMigrations, MigrationsApplied) => Some(Done),
            (ApplyingMigrations, MigrationFailed) => Some(Failed(FailureKind::MigrationFailure)),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapPhase::WaitingForDb => "waiting_for_db",
            BootstrapPhase::ApplyingMigrations => "applying_migrations",
            BootstrapPhase::Done => "done",
            BootstrapPhase::Failed(_) => "failed",
        }
    }
}
