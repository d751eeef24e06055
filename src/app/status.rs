//! Read-only view of the ledger against the migrations on disk.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::app::error::BootstrapError;
use crate::domain::migration::{PlanError, plan};
use crate::ports::{ledger::MigrationLedger, probe::ReadinessProbe, source::MigrationSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Applied,
    Pending,
    /// Applied, but the file changed since.
    Modified,
    /// In the ledger with no file on disk.
    Unknown,
}

impl MigrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationState::Applied => "applied",
            MigrationState::Pending => "pending",
            MigrationState::Modified => "modified",
            MigrationState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: i64,
    pub name: String,
    pub state: MigrationState,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub lines: Vec<StatusLine>,
    /// What would stop `run` from applying the pending migrations.
    pub problem: Option<PlanError>,
}

/// Probes once (no retry loop), then compares ledger and source.
pub async fn migration_status<P, L, M>(
    probe: &P,
    ledger: &L,
    source: &M,
) -> Result<StatusReport, BootstrapError>
where
    P: ReadinessProbe,
    L: MigrationLedger,
    M: MigrationSource,
{
    if let Err(last_error) = probe.check().await {
        warn!(error = %last_error, "Database not reachable for status");
        return Err(BootstrapError::ConnectionUnavailable {
            attempts: 1,
            last_error,
        });
    }

    let available = source
        .load()
        .await
        .map_err(|reason| BootstrapError::MigrationFailure {
            version: None,
            reason,
        })?;
    let applied = ledger
        .applied()
        .await
        .map_err(|reason| BootstrapError::MigrationFailure {
            version: None,
            reason,
        })?;

    let mut lines: BTreeMap<i64, StatusLine> = BTreeMap::new();
    for m in &available {
        lines.insert(
            m.version,
            StatusLine {
                version: m.version,
                name: m.name.clone(),
                state: MigrationState::Pending,
                applied_at: None,
            },
        );
    }
    for row in &applied {
        let line = lines.entry(row.version).or_insert_with(|| StatusLine {
            version: row.version,
            name: row.name.clone(),
            state: MigrationState::Unknown,
            applied_at: None,
        });
        line.applied_at = row.applied_at;
        if line.state == MigrationState::Pending {
            let same = available
                .iter()
                .any(|m| m.version == row.version && m.checksum == row.checksum);
            line.state = if same {
                MigrationState::Applied
            } else {
                MigrationState::Modified
            };
        }
    }

    let problem = plan(&available, &applied).err();
    let lines: Vec<StatusLine> = lines.into_values().collect();
    info!(
        total = lines.len(),
        pending = lines.iter().filter(|l| l.state == MigrationState::Pending).count(),
        "Migration status"
    );
    Ok(StatusReport { lines, problem })
}
