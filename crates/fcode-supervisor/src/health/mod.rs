mod evaluator;
mod monitor;
mod recovery;

pub use evaluator::{classify, evaluate, HealthInput, HealthVerdict};
pub use monitor::{HealthMonitor, TickReport, WorkerOutcome};
pub use recovery::{
    select_recovery_strategy, RecoveryPolicy, MAX_RESTARTS_REASON, STARTUP_RETRY_DELAY_MS,
    STARTUP_RETRY_LIMIT,
};

#[cfg(test)]
mod tests;
