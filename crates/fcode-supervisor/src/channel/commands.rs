use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::metrics::{CpuStats, ErrorStats, HealthMetrics, ResponseTimeStats};
use crate::registry::WorkerSnapshot;
use crate::supervisor::SupervisorStats;

/// Requests accepted on the control socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlCommand {
    Ping,

    Status,

    ListWorkers,

    WorkerStatus {
        pane_id: String,
    },

    WorkerMetrics {
        pane_id: String,
    },

    StartWorker {
        pane_id: String,
        working_dir: PathBuf,
    },

    StopWorker {
        pane_id: String,
    },

    RestartWorker {
        pane_id: String,
    },

    Heartbeat {
        pane_id: String,
    },

    StartMeasurement {
        pane_id: String,
        request_id: String,
    },

    CompleteMeasurement {
        pane_id: String,
        request_id: String,
    },

    RecordError {
        pane_id: String,
        message: String,
    },
}

impl ControlCommand {
    pub fn pane_id(&self) -> Option<&str> {
        match self {
            Self::Ping | Self::Status | Self::ListWorkers => None,
            Self::WorkerStatus { pane_id }
            | Self::WorkerMetrics { pane_id }
            | Self::StartWorker { pane_id, .. }
            | Self::StopWorker { pane_id }
            | Self::RestartWorker { pane_id }
            | Self::Heartbeat { pane_id }
            | Self::StartMeasurement { pane_id, .. }
            | Self::CompleteMeasurement { pane_id, .. }
            | Self::RecordError { pane_id, .. } => Some(pane_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlResponse {
    Pong {
        version: String,
        uptime_secs: u64,
    },

    Status {
        stats: SupervisorStats,
    },

    Workers {
        workers: Vec<WorkerSnapshot>,
    },

    WorkerStatus {
        worker: WorkerSnapshot,
    },

    Metrics {
        health: HealthMetrics,
        cpu: CpuStats,
        response_time: ResponseTimeStats,
        errors: ErrorStats,
    },

    Ack {
        message: Option<String>,
    },

    Measurement {
        elapsed_ms: f64,
    },

    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ControlResponse {
    pub fn ack(message: impl Into<String>) -> Self {
        Self::Ack {
            message: Some(message.into()),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    WorkerNotFound,
    WorkerExists,
    StartFailed,
    RestartFailed,
    UnknownRequest,
    InvalidRequest,
    UnsupportedVersion,
    ChannelClosed,
    InternalError,
}
