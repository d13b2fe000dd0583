use chrono::{DateTime, Utc};
use fcode_types::ProcessError;

use crate::config::SupervisorConfig;

/// Current observations of one worker.
#[derive(Clone, Copy, Debug)]
pub struct HealthInput {
    pub is_alive: bool,
    pub last_heartbeat: DateTime<Utc>,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthVerdict {
    pub is_alive: bool,
    pub is_responsive: bool,
    pub is_memory_ok: bool,
    pub is_cpu_ok: bool,
    pub silent_ms: u64,
}

impl HealthVerdict {
    pub fn is_healthy(&self) -> bool {
        self.is_alive && self.is_responsive && self.is_memory_ok && self.is_cpu_ok
    }
}

pub fn evaluate(input: &HealthInput, config: &SupervisorConfig, now: DateTime<Utc>) -> HealthVerdict {
    let silent_ms = (now - input.last_heartbeat).num_milliseconds().max(0) as u64;
    let threshold_ms = config.unresponsive_after().as_millis() as u64;

    HealthVerdict {
        is_alive: input.is_alive,
        is_responsive: silent_ms < threshold_ms,
        is_memory_ok: input.memory_bytes < config.memory_limit_bytes,
        is_cpu_ok: input.cpu_percent < config.cpu_limit_percent,
        silent_ms,
    }
}

/// Names the failure behind an unhealthy verdict. An exited process always
/// classifies as unresponsive, whatever its last memory reading was.
pub fn classify(verdict: &HealthVerdict) -> ProcessError {
    if !verdict.is_alive {
        ProcessError::UnresponsiveProcess(verdict.silent_ms)
    } else if !verdict.is_memory_ok {
        ProcessError::ResourceExhaustion("Memory".to_string())
    } else {
        ProcessError::UnresponsiveProcess(verdict.silent_ms)
    }
}
