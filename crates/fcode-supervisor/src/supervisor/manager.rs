use chrono::Utc;
use fcode_types::{
    ErrorCategory, FcodeError, FcodeResult, MemoryTrend, ProcessError, WorkerStatus,
    ENV_PANE_ID, ENV_SESSION_ID, ENV_SOCKET_PATH, ENV_SUPERVISOR_SOCKET,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::stats::SupervisorStats;
use crate::config::{SupervisorConfig, WorkerConfig};
use crate::metrics::{
    CpuStats, ErrorStats, HealthMetrics, ResponseTimeStats, CPU_HISTORY_CAPACITY,
    RESPONSE_HISTORY_CAPACITY,
};
use crate::process::{spawn, ProcessProbe, SpawnSpec};
use crate::registry::{Incarnation, WorkerProcess, WorkerRegistry, WorkerSnapshot};

/// CPU samples included in a `HealthMetrics` snapshot.
const METRICS_CPU_SAMPLES: usize = 10;

/// Result of probing one worker during a health tick.
#[derive(Clone, Copy, Debug)]
pub struct WorkerSample {
    pub is_alive: bool,
    pub memory_bytes: Option<u64>,
    pub cpu_percent: f64,
}

/// Owns the worker processes: spawning, stopping, restarting, and the
/// read-side metric queries over the registry.
pub struct WorkerManager {
    registry: Arc<WorkerRegistry>,
    config: SupervisorConfig,
    worker: WorkerConfig,
    supervisor_socket: Option<PathBuf>,
    probe: ProcessProbe,
    started_at: Instant,
}

impl WorkerManager {
    pub fn new(config: SupervisorConfig, worker: WorkerConfig) -> Self {
        Self {
            registry: Arc::new(WorkerRegistry::new()),
            config,
            worker,
            supervisor_socket: None,
            probe: ProcessProbe::new(),
            started_at: Instant::now(),
        }
    }

    /// Advertise the control socket to spawned workers.
    pub fn with_supervisor_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.supervisor_socket = Some(path.into());
        self
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn worker_socket_path(&self, pane_id: &str) -> PathBuf {
        self.worker.socket_path(pane_id)
    }

    /// Returns `false` if the pane is already registered or the process
    /// could not be spawned; the registry is left untouched in both cases.
    pub async fn start_worker(&self, pane_id: &str, working_dir: impl AsRef<Path>) -> bool {
        let working_dir = working_dir.as_ref();
        if self.registry.contains(pane_id) {
            warn!("Worker {} is already running", pane_id);
            return false;
        }

        let incarnation = match self.spawn_incarnation(pane_id, working_dir) {
            Ok(incarnation) => incarnation,
            Err(e) => {
                error!("Failed to start worker {}: {}", pane_id, e);
                return false;
            }
        };

        let pid = incarnation.pid();
        let worker = WorkerProcess::new(pane_id, working_dir.to_path_buf(), incarnation);
        let incarnation = Arc::clone(&worker.incarnation);

        if let Err(e) = self.registry.insert(worker) {
            warn!("{}", e);
            incarnation.process.shutdown(self.config.stop_grace()).await;
            return false;
        }

        info!("Started worker {} (pid {}) in {}", pane_id, pid, working_dir.display());
        true
    }

    /// Removes the pane and terminates its process. `false` if it was not registered.
    pub async fn stop_worker(&self, pane_id: &str) -> bool {
        let stopping = self.registry.update(pane_id, |w| {
            w.status = WorkerStatus::Stopping;
            Arc::clone(&w.incarnation)
        });
        let Some(incarnation) = stopping else {
            debug!("Stop requested for unknown worker {}", pane_id);
            return false;
        };
        self.registry.remove(pane_id);

        if !incarnation.process.shutdown(self.config.stop_grace()).await {
            warn!("Worker {} (pid {}) did not exit", pane_id, incarnation.pid());
        }
        self.remove_worker_socket(pane_id);

        info!("Stopped worker {}", pane_id);
        true
    }

    pub async fn stop_all(&self) {
        let panes = self.registry.pane_ids();
        if panes.is_empty() {
            return;
        }
        info!("Stopping {} worker(s)", panes.len());
        futures::future::join_all(panes.iter().map(|pane| self.stop_worker(pane))).await;
    }

    /// Operator restart of the current incarnation. Clears a manual-intervention marker.
    pub async fn restart_worker(&self, pane_id: &str) -> FcodeResult<()> {
        let generation = self
            .registry
            .get(pane_id)
            .map(|w| w.generation())
            .ok_or_else(|| FcodeError::WorkerNotFound(pane_id.to_string()))?;

        if !self.restart_incarnation(pane_id, generation).await? {
            debug!("Worker {} was restarted concurrently", pane_id);
        }
        Ok(())
    }

    /// Replaces incarnation `expected` of `pane_id`. Returns `Ok(false)` when
    /// another restart already replaced it.
    pub(crate) async fn restart_incarnation(&self, pane_id: &str, expected: u64) -> FcodeResult<bool> {
        let worker = self
            .registry
            .get(pane_id)
            .ok_or_else(|| FcodeError::WorkerNotFound(pane_id.to_string()))?;
        if worker.generation() != expected {
            return Ok(false);
        }

        let old_pid = worker.pid();
        if !worker.incarnation.process.shutdown(self.config.stop_grace()).await {
            warn!("Worker {} (pid {}) survived SIGKILL", pane_id, old_pid);
        }

        let incarnation = match self.spawn_incarnation(pane_id, &worker.working_dir) {
            Ok(incarnation) => incarnation,
            Err(e) => {
                error!("Restart of worker {} failed: {}", pane_id, e);
                self.registry.record_failed_restart(
                    pane_id,
                    expected,
                    ProcessError::StartupFailure(e.to_string()),
                );
                return Err(e);
            }
        };

        let new_pid = incarnation.pid();
        match self.registry.replace_incarnation(pane_id, expected, incarnation) {
            Ok(_previous) => {
                let restarts = self.registry.get(pane_id).map(|w| w.restart_count).unwrap_or(0);
                info!(
                    "Restarted worker {} (pid {} -> {}, restart #{})",
                    pane_id, old_pid, new_pid, restarts
                );
                Ok(true)
            }
            Err(orphan) => {
                debug!("Discarding replacement for worker {} (pid {})", pane_id, new_pid);
                orphan.process.shutdown(self.config.stop_grace()).await;
                Ok(false)
            }
        }
    }

    pub fn record_heartbeat(&self, pane_id: &str) -> bool {
        self.registry
            .update(pane_id, |w| w.last_heartbeat = Utc::now())
            .is_some()
    }

    /// Probes the OS for the current incarnation and feeds the CPU and memory trackers.
    pub fn sample(&self, worker: &WorkerProcess) -> WorkerSample {
        let incarnation = &worker.incarnation;
        if !incarnation.process.is_alive() {
            return WorkerSample {
                is_alive: false,
                memory_bytes: None,
                cpu_percent: 0.0,
            };
        }

        let sample = self.probe.sample(incarnation.pid());
        if let Some(bytes) = sample.memory_bytes {
            incarnation.memory.record(bytes);
        }
        let cpu_percent = match sample.cpu_time {
            Some(cpu_time) => incarnation.cpu.record(sample.pid, cpu_time, sample.taken_at),
            None => incarnation.cpu.last_usage(),
        };

        WorkerSample {
            is_alive: true,
            memory_bytes: sample.memory_bytes,
            cpu_percent,
        }
    }

    pub fn get_worker_status(&self, pane_id: &str) -> Option<WorkerStatus> {
        self.registry.get(pane_id).map(|w| w.status)
    }

    pub fn get_worker(&self, pane_id: &str) -> Option<WorkerSnapshot> {
        self.registry.get(pane_id).map(|w| w.snapshot())
    }

    pub fn get_all_workers(&self) -> Vec<WorkerSnapshot> {
        self.registry.snapshots()
    }

    /// Fresh metrics for one pane. Reads memory from the OS; CPU comes from
    /// the latest sample taken by the monitor.
    pub fn get_worker_metrics(&self, pane_id: &str) -> Option<HealthMetrics> {
        let worker = self.registry.get(pane_id)?;
        let incarnation = &worker.incarnation;

        let alive = incarnation.process.is_alive();
        let memory = if alive {
            self.probe.sample(incarnation.pid()).memory_bytes
        } else {
            None
        };
        let memory_trend = match memory {
            Some(_) => incarnation.memory.trend(),
            None => MemoryTrend::Error,
        };

        Some(HealthMetrics {
            pane_id: worker.pane_id.clone(),
            status: worker.status,
            pid: alive.then(|| incarnation.pid()),
            uptime_secs: incarnation.uptime_secs(Utc::now()),
            memory_bytes: memory.unwrap_or(0),
            cpu_percent: incarnation.cpu.last_usage(),
            last_response_ms: worker.response_times.last_ms(),
            error_count: worker.errors.total(),
            error_rate_per_hour: worker.errors.error_rate(),
            restart_count: worker.restart_count,
            cpu_history: incarnation.cpu.history(METRICS_CPU_SAMPLES),
            memory_trend,
        })
    }

    pub fn cpu_stats(&self, pane_id: &str) -> Option<CpuStats> {
        let worker = self.registry.get(pane_id)?;
        let cpu = &worker.incarnation.cpu;
        Some(CpuStats {
            current: cpu.last_usage(),
            average: cpu.average(),
            peak: cpu.peak(),
            history: cpu.history(CPU_HISTORY_CAPACITY),
        })
    }

    pub fn response_time_stats(&self, pane_id: &str) -> Option<ResponseTimeStats> {
        let worker = self.registry.get(pane_id)?;
        let tracker = &worker.response_times;
        Some(ResponseTimeStats {
            last_ms: tracker.last_ms(),
            average_ms: tracker.average_ms(),
            pending: tracker.pending_count(),
            samples: tracker.sample_count(),
            history: tracker.history(RESPONSE_HISTORY_CAPACITY),
        })
    }

    pub fn error_stats(&self, pane_id: &str) -> Option<ErrorStats> {
        let worker = self.registry.get(pane_id)?;
        let errors = &worker.errors;
        Some(ErrorStats {
            total: errors.total(),
            ipc: errors.count(ErrorCategory::Ipc),
            crash: errors.count(ErrorCategory::Crash),
            timeout: errors.count(ErrorCategory::Timeout),
            other: errors.count(ErrorCategory::Other),
            rate_per_hour: errors.error_rate(),
            window_saturated: errors.window_saturated(),
            last_error: errors.last_error(),
        })
    }

    pub fn start_measurement(&self, pane_id: &str, request_id: &str) -> bool {
        match self.registry.get(pane_id) {
            Some(worker) => {
                worker.response_times.start_measurement(request_id);
                true
            }
            None => false,
        }
    }

    /// Elapsed milliseconds, or `UNKNOWN_REQUEST` for an id that was never started.
    pub fn complete_measurement(&self, pane_id: &str, request_id: &str) -> Option<f64> {
        self.registry
            .get(pane_id)
            .map(|w| w.response_times.complete_measurement(request_id))
    }

    pub fn record_error(&self, pane_id: &str, message: &str) -> bool {
        match self.registry.get(pane_id) {
            Some(worker) => {
                worker.errors.record_message(message);
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> SupervisorStats {
        let mut stats = SupervisorStats {
            total_restarts: self.registry.total_restarts(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            ..Default::default()
        };
        for worker in self.registry.workers() {
            stats.record(worker.status, worker.needs_manual_intervention());
        }
        stats
    }

    fn spawn_incarnation(&self, pane_id: &str, working_dir: &Path) -> FcodeResult<Incarnation> {
        let generation = self.registry.next_generation();
        let session_id = Uuid::new_v4();
        let socket_path = self.worker.socket_path(pane_id);
        self.remove_worker_socket(pane_id);

        let mut env: Vec<(String, String)> = self
            .worker
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.push((ENV_PANE_ID.to_string(), pane_id.to_string()));
        env.push((ENV_SOCKET_PATH.to_string(), socket_path.display().to_string()));
        env.push((ENV_SESSION_ID.to_string(), session_id.to_string()));
        if let Some(ref supervisor_socket) = self.supervisor_socket {
            env.push((
                ENV_SUPERVISOR_SOCKET.to_string(),
                supervisor_socket.display().to_string(),
            ));
        }

        let process = spawn(&SpawnSpec {
            label: pane_id.to_string(),
            command: self.worker.command.clone(),
            args: self.worker.args.clone(),
            working_dir: Some(working_dir.to_path_buf()),
            env,
        })?;

        debug!(
            "Spawned worker {} generation {} (pid {}, session {})",
            pane_id,
            generation,
            process.pid(),
            session_id
        );
        Ok(Incarnation::new(generation, session_id, process))
    }

    fn remove_worker_socket(&self, pane_id: &str) {
        let path = self.worker.socket_path(pane_id);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed socket {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove socket {}: {}", path.display(), e),
        }
    }
}

impl std::fmt::Debug for WorkerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerManager")
            .field("workers", &self.registry.len())
            .field("command", &self.worker.command)
            .finish()
    }
}
