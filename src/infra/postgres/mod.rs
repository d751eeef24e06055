//! Postgres adapters: the readiness probe and the `schema_migrations` ledger.
mod connection;
mod ledger;

pub use connection::{PgReadinessProbe, connect_options, lazy_pool, ssl_mode};
pub use ledger::PgMigrationLedger;
