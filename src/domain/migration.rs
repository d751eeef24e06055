//! Migrations as loaded from disk, ledger rows, and the plan that reconciles them.
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::hashing::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub sql: String,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let checksum = sha256_hex(sql.as_bytes());
        Self {
            version,
            name: name.into(),
            sql,
            checksum,
        }
    }
}

/// One row of the `schema_migrations` ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
    pub applied_at: Option<DateTime<Utc>>,
    pub execution_ms: i64,
}

/// Splits `0003_add_index.sql` into `(3, "add_index")`.
///
/// Returns `None` for anything that is not a `.sql` file; `Some(Err(_))` for
/// a `.sql` file whose name does not follow `<version>_<name>.sql`.
pub fn parse_file_name(file_name: &str) -> Option<Result<(i64, String), String>> {
    if file_name.starts_with('.') {
        return None;
    }
    let ext_at = file_name.len().checked_sub(4)?;
    let (stem, ext) = (file_name.get(..ext_at)?, file_name.get(ext_at..)?);
    if !ext.eq_ignore_ascii_case(".sql") {
        return None;
    }

    let Some((digits, name)) = stem.split_once('_') else {
        return Some(Err(format!(
            "migration file '{file_name}' must be named <version>_<name>.sql"
        )));
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Some(Err(format!(
            "migration file '{file_name}' has a non-numeric version '{digits}'"
        )));
    }
    let version = match digits.parse::<i64>() {
        Ok(v) if v > 0 => v,
        Ok(_) => {
            return Some(Err(format!(
                "migration file '{file_name}' must have a version greater than zero"
            )));
        }
        Err(e) => {
            return Some(Err(format!(
                "migration file '{file_name}' version out of range: {e}"
            )));
        }
    };
    if name.trim().is_empty() {
        return Some(Err(format!("migration file '{file_name}' has an empty name")));
    }
    Some(Ok((version, name.to_string())))
}

/// Sorts by version and rejects duplicates.
pub fn order_migrations(mut migrations: Vec<Migration>) -> Result<Vec<Migration>, String> {
    migrations.sort_by_key(|m| m.version);
    for pair in migrations.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(format!(
                "duplicate migration version {}: '{}' and '{}'",
                pair[0].version, pair[0].name, pair[1].name
            ));
        }
    }
    Ok(migrations)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error(
        "migration {version} ('{name}') was modified after it was applied \
         (ledger checksum {applied}, file checksum {current})"
    )]
    ChecksumMismatch {
        version: i64,
        name: String,
        applied: String,
        current: String,
    },
    #[error(
        "migration {version} ('{name}') is pending but version {latest_applied} \
         is already applied; renumber it above {latest_applied}"
    )]
    OutOfOrder {
        version: i64,
        name: String,
        latest_applied: i64,
    },
}

impl PlanError {
    pub fn version(&self) -> i64 {
        match self {
            PlanError::ChecksumMismatch { version, .. } | PlanError::OutOfOrder { version, .. } => {
                *version
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub pending: Vec<Migration>,
    pub already_applied: usize,
    /// In the ledger, but no file on disk.
    pub unknown_applied: Vec<i64>,
}

impl MigrationPlan {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Reconciles ordered migrations against the ledger.
pub fn plan(available: &[Migration], applied: &[AppliedMigration]) -> Result<MigrationPlan, PlanError> {
    let applied_by_version: HashMap<i64, &AppliedMigration> =
        applied.iter().map(|a| (a.version, a)).collect();
    let latest_applied = applied.iter().map(|a| a.version).max();

    let mut out = MigrationPlan::default();
    for m in available {
        match applied_by_version.get(&m.version) {
            Some(row) if row.checksum != m.checksum => {
                return Err(PlanError::ChecksumMismatch {
                    version: m.version,
                    name: m.name.clone(),
                    applied: row.checksum.clone(),
                    current: m.checksum.clone(),
                });
            }
            Some(_) => out.already_applied += 1,
            None => {
                if let Some(latest) = latest_applied
                    && m.version < latest
                {
                    return Err(PlanError::OutOfOrder {
                        version: m.version,
                        name: m.name.clone(),
                        latest_applied: latest,
                    });
                }
                out.pending.push(m.clone());
            }
        }
    }

    let on_disk: HashSet<i64> = available.iter().map(|m| m.version).collect();
    let mut unknown: Vec<i64> = applied
        .iter()
        .map(|a| a.version)
        .filter(|v| !on_disk.contains(v))
        .collect();
    unknown.sort_unstable();
    out.unknown_applied = unknown;

    Ok(out)
}
