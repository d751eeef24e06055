//! Sleep abstraction so the polling loop can be driven without real delays.
use std::time::Duration;

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
