use crate::domain::model::RetryPolicy;
use crate::ports::{
    ledger::MigrationLedger, probe::ReadinessProbe, sleeper::Sleeper, source::MigrationSource,
};

pub struct BootstrapContext<P, L, M, S>
where
    P: ReadinessProbe,
    L: MigrationLedger,
    M: MigrationSource,
    S: Sleeper,
{
    pub retry: RetryPolicy,
    pub probe: P,
    pub ledger: L,
    pub source: M,
    pub sleeper: S,
}
