//! Migration source reading `<version>_<name>.sql` files from one directory.
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::domain::migration::{Migration, order_migrations, parse_file_name};
use crate::ports::source::MigrationSource;

pub struct SqlDirSource {
    dir: PathBuf,
}

impl SqlDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl MigrationSource for SqlDirSource {
    async fn load(&self) -> Result<Vec<Migration>, String> {
        load_dir(&self.dir).await
    }
}

pub async fn load_dir(dir: &Path) -> Result<Vec<Migration>, String> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| format!("migrations dir '{}' unreadable: {e}", dir.display()))?;

    let mut migrations = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| format!("migrations dir '{}' unreadable: {e}", dir.display()))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| format!("stat {}: {e}", entry.path().display()))?;
        if file_type.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            return Err(format!(
                "migration file '{}' has a non-UTF-8 name",
                entry.path().display()
            ));
        };
        let Some(parsed) = parse_file_name(file_name) else {
            debug!(file = file_name, "Skipping non-migration file");
            continue;
        };
        let (version, name) = parsed?;
        let sql = fs::read_to_string(entry.path())
            .await
            .map_err(|e| format!("read {}: {e}", entry.path().display()))?;
        if sql.trim().is_empty() {
            return Err(format!("migration file '{file_name}' is empty"));
        }
        migrations.push(Migration::new(version, name, sql));
    }

    let migrations = order_migrations(migrations)?;
    debug!(dir = %dir.display(), count = migrations.len(), "Loaded migrations");
    Ok(migrations)
}
