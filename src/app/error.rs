use crate::domain::phase::FailureKind;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("database unavailable after {attempts} attempt(s): {last_error}")]
    ConnectionUnavailable { attempts: u32, last_error: String },
    #[error("migration failed{}: {reason}", at_version(.version))]
    MigrationFailure { version: Option<i64>, reason: String },
}

fn at_version(version: &Option<i64>) -> String {
    version.map(|v| format!(" at version {v}")).unwrap_or_default()
}

impl BootstrapError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BootstrapError::ConnectionUnavailable { .. } => FailureKind::ConnectionUnavailable,
            BootstrapError::MigrationFailure { .. } => FailureKind::MigrationFailure,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}
