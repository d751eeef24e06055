//! Builds `BootstrapConfig` once at startup from `DATABASE_*` / `BOOTSTRAP_*` environment variables.
mod defaults;
mod parse;

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::model::{BootstrapConfig, ConnectionTarget, LogFormat, RetryPolicy};

use defaults::*;
use parse::{parse_at_least, parse_bool, parse_log_format, parse_port};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Distinct from the bootstrap's own 1 (unreachable) and 2 (migration).
    pub fn exit_code(&self) -> u8 {
        3
    }
}

/// Command-line values that win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_attempts: Option<u32>,
    pub interval_secs: Option<u64>,
    pub migrations_dir: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the process environment, after seeding it from `.env` if one exists.
    pub fn from_env() -> Result<BootstrapConfig, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset,
    /// except the password, which may legitimately be empty.
    pub fn load_with<F>(lookup: F) -> Result<BootstrapConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let password = lookup(ENV_PASSWORD).ok_or(ConfigError::Missing(ENV_PASSWORD))?;

        let port = match var(ENV_PORT) {
            Some(raw) => parse_port(ENV_PORT, &raw)?,
            None => default_port(),
        };
        let ssl = match var(ENV_SSL) {
            Some(raw) => parse_bool(ENV_SSL, &raw)?,
            None => default_ssl(),
        };
        let target = ConnectionTarget {
            host: var(ENV_HOST).map(|h| h.trim().to_string()).unwrap_or_else(default_host),
            port,
            user: var(ENV_USER).unwrap_or_else(default_user),
            password,
            database: var(ENV_NAME).unwrap_or_else(default_database),
            ssl,
        };

        let max_attempts = match var(ENV_MAX_ATTEMPTS) {
            Some(raw) => parse_at_least::<u32>(ENV_MAX_ATTEMPTS, &raw, 1)?,
            None => default_max_attempts(),
        };
        let interval_secs = match var(ENV_RETRY_INTERVAL) {
            Some(raw) => parse_at_least::<u64>(ENV_RETRY_INTERVAL, &raw, 0)?,
            None => default_retry_interval_secs(),
        };
        let connect_timeout_secs = match var(ENV_CONNECT_TIMEOUT) {
            Some(raw) => parse_at_least::<u64>(ENV_CONNECT_TIMEOUT, &raw, 1)?,
            None => default_connect_timeout_secs(),
        };

        let log_level = normalize_log_level(&var(ENV_LOG_LEVEL).unwrap_or_else(default_log_level))?;
        let log_format = match var(ENV_LOG_FORMAT) {
            Some(raw) => parse_log_format(ENV_LOG_FORMAT, &raw)?,
            None => LogFormat::default(),
        };

        Ok(BootstrapConfig {
            target,
            retry: RetryPolicy::new(max_attempts, Duration::from_secs(interval_secs)),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            migrations_dir: PathBuf::from(
                var(ENV_MIGRATIONS_DIR)
                    .map(|p| p.trim().to_string())
                    .unwrap_or_else(default_migrations_dir),
            ),
            log_level,
            log_format,
        })
    }

    pub fn apply_overrides(
        mut cfg: BootstrapConfig,
        overrides: &ConfigOverrides,
    ) -> Result<BootstrapConfig, ConfigError> {
        if overrides.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "--max-attempts must be at least 1".into(),
            ));
        }
        let max_attempts = overrides.max_attempts.unwrap_or(cfg.retry.max_attempts());
        let interval = overrides
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(cfg.retry.interval);
        cfg.retry = RetryPolicy::new(max_attempts, interval);
        if let Some(dir) = &overrides.migrations_dir {
            cfg.migrations_dir = dir.clone();
        }
        Ok(cfg)
    }
}
