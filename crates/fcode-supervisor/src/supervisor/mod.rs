mod cancellation;
mod core;
mod manager;
mod stats;

pub use cancellation::{CancellationSource, CancellationToken};
pub use self::core::Supervisor;
pub use manager::{WorkerManager, WorkerSample};
pub use stats::SupervisorStats;
