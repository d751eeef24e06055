use super::ConfigError;

pub(crate) const ENV_HOST: &str = "DATABASE_HOST";
pub(crate) const ENV_PORT: &str = "DATABASE_PORT";
pub(crate) const ENV_USER: &str = "DATABASE_USER";
pub(crate) const ENV_PASSWORD: &str = "DATABASE_PASSWORD";
pub(crate) const ENV_NAME: &str = "DATABASE_NAME";
pub(crate) const ENV_SSL: &str = "DATABASE_SSL";
pub(crate) const ENV_MAX_ATTEMPTS: &str = "BOOTSTRAP_MAX_ATTEMPTS";
pub(crate) const ENV_RETRY_INTERVAL: &str = "BOOTSTRAP_RETRY_INTERVAL_SECS";
pub(crate) const ENV_CONNECT_TIMEOUT: &str = "BOOTSTRAP_CONNECT_TIMEOUT_SECS";
pub(crate) const ENV_MIGRATIONS_DIR: &str = "MIGRATIONS_DIR";
pub(crate) const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub(crate) const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

pub(crate) fn default_host() -> String {
    "localhost".to_string()
}

pub(crate) fn default_port() -> u16 {
    5432
}

pub(crate) fn default_user() -> String {
    "app_user".to_string()
}

pub(crate) fn default_database() -> String {
    "app_db".to_string()
}

pub(crate) fn default_ssl() -> bool {
    false
}

/// 30 probes, 2s apart: roughly a minute before giving up.
pub(crate) fn default_max_attempts() -> u32 {
    30
}

pub(crate) fn default_retry_interval_secs() -> u64 {
    2
}

pub(crate) fn default_connect_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_migrations_dir() -> String {
    "migrations".to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn normalize_log_level(level: &str) -> Result<String, ConfigError> {
    let l = level.trim().to_ascii_lowercase();
    if l.is_empty() {
        return Err(ConfigError::Invalid(format!("{ENV_LOG_LEVEL} cannot be empty")));
    }
    match l.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => Ok(l),
        _ => Err(ConfigError::Invalid(format!(
            "invalid {ENV_LOG_LEVEL} '{level}', expected error|warn|info|debug|trace|off"
        ))),
    }
}
