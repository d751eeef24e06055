//! Async seams the bootstrap runner depends on; `infra` provides the real adapters.
pub mod ledger;
pub mod probe;
pub mod sleeper;
pub mod source;
