//! Readiness probe abstraction.
#[async_trait::async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// One connectivity check. `Err` carries a human-readable reason.
    async fn check(&self) -> Result<(), String>;
}
