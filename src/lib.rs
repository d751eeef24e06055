//! Deployment-time database bootstrap: wait for Postgres to accept
//! connections, then apply ordered SQL migrations tracked in a ledger table.
//!
//! The crate is split the usual way: `domain` holds pure types and rules,
//! `ports` the async traits the runner depends on, `infra` the Postgres,
//! filesystem, config and logging adapters, and `app` the runner itself.
pub mod app;
pub mod domain;
pub mod infra;
pub mod ports;
