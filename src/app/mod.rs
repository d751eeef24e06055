//! Application layer: the bootstrap runner and the read-only status report.
pub mod bootstrap;
pub mod context;
pub mod error;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;
