//! Infrastructure adapters: config loading, logging setup, Postgres probe and ledger, SQL directory, sleeping.
pub mod config;
pub mod logging;
pub mod postgres;
pub mod sql_dir;
pub mod tokio_sleeper;
