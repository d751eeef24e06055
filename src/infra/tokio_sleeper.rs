//! `Sleeper` implementation backed by `tokio::time::sleep`.
use std::time::Duration;

use crate::ports::sleeper::Sleeper;

#[derive(Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
