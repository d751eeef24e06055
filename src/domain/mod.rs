//! Core domain types and rules: connection target, retry policy, migration plan, bootstrap phases.
pub mod hashing;
pub mod migration;
pub mod model;
pub mod phase;
