use chrono::{DateTime, Utc};
use fcode_types::{ProcessError, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

use crate::metrics::{
    ErrorCounter, MemoryHistory, ProcessMetricsTracker, ResponseTimeTracker,
    CPU_HISTORY_CAPACITY, MEMORY_HISTORY_CAPACITY, RESPONSE_HISTORY_CAPACITY,
};
use crate::process::ProcessHandle;

/// One spawn-to-exit lifetime of a worker. Replaced wholesale on restart.
#[derive(Debug)]
pub struct Incarnation {
    pub generation: u64,
    pub session_id: Uuid,
    pub process: ProcessHandle,
    pub started_at: DateTime<Utc>,
    pub cpu: ProcessMetricsTracker,
    pub memory: MemoryHistory,
}

impl Incarnation {
    pub fn new(generation: u64, session_id: Uuid, process: ProcessHandle) -> Self {
        Self {
            generation,
            session_id,
            process,
            started_at: Utc::now(),
            cpu: ProcessMetricsTracker::new(CPU_HISTORY_CAPACITY),
            memory: MemoryHistory::new(MEMORY_HISTORY_CAPACITY),
        }
    }

    pub fn pid(&self) -> u32 {
        self.process.pid()
    }

    pub fn uptime_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }
}

/// Registry entry for one pane: a stable identity plus its current incarnation.
///
/// Cloning is cheap; trackers and the incarnation are shared.
#[derive(Clone)]
pub struct WorkerProcess {
    pub pane_id: String,
    pub working_dir: PathBuf,
    pub status: WorkerStatus,
    pub restart_count: u32,
    pub last_heartbeat: DateTime<Utc>,
    pub last_restart: Option<DateTime<Utc>>,
    pub last_error: Option<ProcessError>,
    pub manual_intervention: Option<String>,
    pub incarnation: Arc<Incarnation>,
    pub response_times: Arc<ResponseTimeTracker>,
    pub errors: Arc<ErrorCounter>,
    pub(crate) restart_pending: Arc<AtomicBool>,
}

impl WorkerProcess {
    pub fn new(pane_id: &str, working_dir: PathBuf, incarnation: Incarnation) -> Self {
        Self {
            pane_id: pane_id.to_string(),
            working_dir,
            status: WorkerStatus::Starting,
            restart_count: 0,
            last_heartbeat: incarnation.started_at,
            last_restart: None,
            last_error: None,
            manual_intervention: None,
            incarnation: Arc::new(incarnation),
            response_times: Arc::new(ResponseTimeTracker::new(RESPONSE_HISTORY_CAPACITY)),
            errors: Arc::new(ErrorCounter::new()),
            restart_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pid(&self) -> u32 {
        self.incarnation.pid()
    }

    pub fn session_id(&self) -> Uuid {
        self.incarnation.session_id
    }

    pub fn generation(&self) -> u64 {
        self.incarnation.generation
    }

    pub fn needs_manual_intervention(&self) -> bool {
        self.manual_intervention.is_some()
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            pane_id: self.pane_id.clone(),
            status: self.status,
            pid: self.pid(),
            session_id: self.session_id().to_string(),
            generation: self.generation(),
            restart_count: self.restart_count,
            working_dir: self.working_dir.clone(),
            started_at: self.incarnation.started_at,
            last_heartbeat: self.last_heartbeat,
            last_error: self.last_error.clone(),
            manual_intervention: self.manual_intervention.clone(),
        }
    }
}

impl std::fmt::Debug for WorkerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerProcess")
            .field("pane_id", &self.pane_id)
            .field("status", &self.status)
            .field("pid", &self.pid())
            .field("restart_count", &self.restart_count)
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSnapshot {
    pub pane_id: String,
    pub status: WorkerStatus,
    pub pid: u32,
    pub session_id: String,
    pub generation: u64,
    pub restart_count: u32,
    pub working_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub last_error: Option<ProcessError>,
    pub manual_intervention: Option<String>,
}
