use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Where the bootstrap connects. Built once from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl: bool,
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.ssl { "require" } else { "disable" };
        write!(
            f,
            "postgres://{}@{}:{}/{}?sslmode={mode}",
            self.user, self.host, self.port, self.database
        )
    }
}

// Hand-written so the password never lands in logs via `?target`.
impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish()
    }
}

/// Fixed-interval polling budget for the readiness phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one probe.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound on time spent sleeping; probe time is extra.
    pub fn total_sleep(&self) -> Duration {
        self.interval * (self.max_attempts - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub target: ConnectionTarget,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub migrations_dir: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
}
