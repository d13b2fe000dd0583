pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 2 * 1024 * 1024 * 1024;
pub const DEFAULT_CPU_LIMIT_PERCENT: f64 = 90.0;
pub const DEFAULT_MAX_RESTARTS: u32 = 5;
pub const DEFAULT_RESTART_COOLDOWN_MS: u64 = 0;
pub const DEFAULT_HEALTH_CHECK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PREVENTIVE_RESTART_SECS: u64 = 0;
pub const DEFAULT_STOP_GRACE_MS: u64 = 5_000;
pub const DEFAULT_LISTEN_BACKLOG: u32 = 128;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WORKER_COMMAND: &str = "claude";

pub const UNRESPONSIVE_HEARTBEAT_MULTIPLIER: u32 = 3;
pub const PROBE_HEARTBEAT_MULTIPLIER: u32 = 5;
