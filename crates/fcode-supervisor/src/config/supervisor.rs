use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::*;

/// Health thresholds and restart limits. Read-only once the supervisor is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub heartbeat_interval_ms: u64,
    pub memory_limit_bytes: u64,
    pub cpu_limit_percent: f64,
    pub max_restarts: u32,
    pub restart_cooldown_ms: u64,
    pub health_check_timeout_ms: u64,
    /// Zero disables preventive restarts.
    pub preventive_restart_secs: u64,
    pub stop_grace_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            cpu_limit_percent: DEFAULT_CPU_LIMIT_PERCENT,
            max_restarts: DEFAULT_MAX_RESTARTS,
            restart_cooldown_ms: DEFAULT_RESTART_COOLDOWN_MS,
            health_check_timeout_ms: DEFAULT_HEALTH_CHECK_TIMEOUT_MS,
            preventive_restart_secs: DEFAULT_PREVENTIVE_RESTART_SECS,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
        }
    }
}

impl SupervisorConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn unresponsive_after(&self) -> Duration {
        self.heartbeat_interval() * UNRESPONSIVE_HEARTBEAT_MULTIPLIER
    }

    pub fn probe_interval(&self) -> Duration {
        self.heartbeat_interval() * PROBE_HEARTBEAT_MULTIPLIER
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_millis(self.restart_cooldown_ms)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn preventive_restart_interval(&self) -> Option<Duration> {
        (self.preventive_restart_secs > 0).then(|| Duration::from_secs(self.preventive_restart_secs))
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}
