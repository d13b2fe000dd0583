use fcode_types::{MemoryTrend, WorkerStatus};
use serde::{Deserialize, Serialize};

/// Point-in-time health of one worker; rebuilt on every query.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub pane_id: String,
    pub status: WorkerStatus,
    pub pid: Option<u32>,
    pub uptime_secs: u64,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
    pub last_response_ms: Option<f64>,
    pub error_count: u64,
    pub error_rate_per_hour: f64,
    pub restart_count: u32,
    pub cpu_history: Vec<f64>,
    pub memory_trend: MemoryTrend,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub current: f64,
    pub average: f64,
    pub peak: f64,
    pub history: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeStats {
    pub last_ms: Option<f64>,
    pub average_ms: f64,
    pub pending: usize,
    pub samples: usize,
    pub history: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub total: u64,
    pub ipc: u64,
    pub crash: u64,
    pub timeout: u64,
    pub other: u64,
    pub rate_per_hour: f64,
    pub window_saturated: bool,
    pub last_error: Option<String>,
}
