#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod health;
pub mod ipc;
pub mod metrics;
pub mod process;
pub mod registry;
pub mod supervisor;

pub use channel::{CommandChannel, ControlCommand, ControlResponse, ErrorCode, WorkerCommandChannel};
pub use config::{DaemonConfig, IpcConfig, LoggingConfig, SupervisorConfig, WorkerConfig};
pub use health::{
    classify, evaluate, select_recovery_strategy, HealthInput, HealthMonitor, HealthVerdict,
    RecoveryPolicy,
};
pub use ipc::{Connection, Envelope, IpcError, SocketServer, SupervisorClient};
pub use metrics::{
    BoundedRingBuffer, CpuStats, ErrorCounter, ErrorStats, HealthMetrics, ProcessMetricsTracker,
    ResponseTimeStats, ResponseTimeTracker,
};
pub use registry::{WorkerProcess, WorkerRegistry, WorkerSnapshot};
pub use supervisor::{CancellationSource, CancellationToken, Supervisor, SupervisorStats, WorkerManager};
