//! Connect options, the one-shot readiness probe, and the pool used for migrations.
use std::time::Duration;

use sqlx::{
    Connection, PgConnection, PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use tracing::debug;

use crate::domain::model::ConnectionTarget;
use crate::ports::probe::ReadinessProbe;

pub fn ssl_mode(ssl: bool) -> PgSslMode {
    if ssl {
        PgSslMode::Require
    } else {
        PgSslMode::Disable
    }
}

pub fn connect_options(target: &ConnectionTarget) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&target.host)
        .port(target.port)
        .username(&target.user)
        .password(&target.password)
        .database(&target.database)
        .ssl_mode(ssl_mode(target.ssl))
        .application_name("db-bootstrap")
}

/// Single connection for the migration phase. Lazy, so building it before
/// the database is up costs nothing.
pub fn lazy_pool(target: &ConnectionTarget, acquire_timeout: Duration) -> PgPool {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(acquire_timeout)
        .connect_lazy_with(connect_options(target))
}

/// Opens a fresh connection, runs `SELECT 1`, closes it. Nothing is pooled
/// between attempts.
pub struct PgReadinessProbe {
    opts: PgConnectOptions,
    timeout: Duration,
}

impl PgReadinessProbe {
    pub fn new(target: &ConnectionTarget, timeout: Duration) -> Self {
        Self {
            opts: connect_options(target),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl ReadinessProbe for PgReadinessProbe {
    async fn check(&self) -> Result<(), String> {
        let attempt = async {
            let mut conn = PgConnection::connect_with(&self.opts)
                .await
                .map_err(|e| format!("postgres connect error: {e}"))?;
            // On error the connection is dropped, which closes the socket.
            sqlx::query("SELECT 1")
                .execute(&mut conn)
                .await
                .map_err(|e| format!("postgres probe query error: {e}"))?;
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Probe connection did not close cleanly");
            }
            Ok::<(), String>(())
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(res) => res,
            Err(_) => Err(format!(
                "postgres connect timed out after {}s",
                self.timeout.as_secs_f32()
            )),
        }
    }
}
