mod constants;
mod daemon;
mod ipc;
mod logging;
mod supervisor;
mod types;
mod worker;

pub use constants::*;
pub use daemon::DaemonConfig;
pub use ipc::IpcConfig;
pub use logging::LoggingConfig;
pub use supervisor::SupervisorConfig;
pub use types::LogLevel;
pub use worker::WorkerConfig;
