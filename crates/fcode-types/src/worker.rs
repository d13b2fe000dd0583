use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Starting,
    Running,
    Unhealthy,
    Crashed,
    Stopping,
}

impl WorkerStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerStatus::Starting | WorkerStatus::Running)
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Starting => write!(f, "starting"),
            WorkerStatus::Running => write!(f, "running"),
            WorkerStatus::Unhealthy => write!(f, "unhealthy"),
            WorkerStatus::Crashed => write!(f, "crashed"),
            WorkerStatus::Stopping => write!(f, "stopping"),
        }
    }
}

/// Coarse direction of a worker's resident memory over its current incarnation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTrend {
    Stable,
    Increasing,
    Decreasing,
    #[default]
    Unknown,
    Error,
}

impl std::fmt::Display for MemoryTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryTrend::Stable => write!(f, "stable"),
            MemoryTrend::Increasing => write!(f, "increasing"),
            MemoryTrend::Decreasing => write!(f, "decreasing"),
            MemoryTrend::Unknown => write!(f, "unknown"),
            MemoryTrend::Error => write!(f, "error"),
        }
    }
}
