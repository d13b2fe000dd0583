use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fcode_types::{FcodeError, FcodeResult, ProcessError, WorkerStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::worker::{Incarnation, WorkerProcess, WorkerSnapshot};

/// Concurrent pane-id → worker map. Each call is atomic for its key only.
pub struct WorkerRegistry {
    workers: DashMap<String, WorkerProcess>,
    next_generation: AtomicU64,
    total_restarts: AtomicU64,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: DashMap::new(),
            next_generation: AtomicU64::new(1),
            total_restarts: AtomicU64::new(0),
        }
    }

    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, worker: WorkerProcess) -> FcodeResult<()> {
        match self.workers.entry(worker.pane_id.clone()) {
            Entry::Occupied(_) => Err(FcodeError::WorkerExists(worker.pane_id)),
            Entry::Vacant(slot) => {
                slot.insert(worker);
                Ok(())
            }
        }
    }

    pub fn get(&self, pane_id: &str) -> Option<WorkerProcess> {
        self.workers.get(pane_id).map(|w| w.value().clone())
    }

    pub fn contains(&self, pane_id: &str) -> bool {
        self.workers.contains_key(pane_id)
    }

    pub fn update<R>(&self, pane_id: &str, f: impl FnOnce(&mut WorkerProcess) -> R) -> Option<R> {
        self.workers.get_mut(pane_id).map(|mut w| f(w.value_mut()))
    }

    pub fn remove(&self, pane_id: &str) -> Option<WorkerProcess> {
        self.workers.remove(pane_id).map(|(_, w)| w)
    }

    /// Swaps in `replacement` only if the entry still carries generation `expected`.
    ///
    /// On success the previous incarnation is returned so the caller can dispose of it;
    /// on mismatch (or a removed pane) `replacement` is handed back untouched.
    pub fn replace_incarnation(
        &self,
        pane_id: &str,
        expected: u64,
        replacement: Incarnation,
    ) -> Result<Arc<Incarnation>, Incarnation> {
        let Some(mut worker) = self.workers.get_mut(pane_id) else {
            return Err(replacement);
        };
        if worker.incarnation.generation != expected {
            return Err(replacement);
        }

        let now = Utc::now();
        let previous = std::mem::replace(&mut worker.incarnation, Arc::new(replacement));
        worker.status = WorkerStatus::Starting;
        worker.restart_count = worker.restart_count.saturating_add(1);
        worker.last_heartbeat = now;
        worker.last_restart = Some(now);
        worker.last_error = None;
        worker.manual_intervention = None;
        self.total_restarts.fetch_add(1, Ordering::Relaxed);
        Ok(previous)
    }

    /// Records a restart attempt that never produced a process.
    pub fn record_failed_restart(&self, pane_id: &str, expected: u64, error: ProcessError) -> bool {
        self.update(pane_id, |worker| {
            if worker.incarnation.generation != expected {
                return false;
            }
            worker.status = WorkerStatus::Crashed;
            worker.restart_count = worker.restart_count.saturating_add(1);
            worker.last_restart = Some(Utc::now());
            worker.errors.record_process_error(&error);
            worker.last_error = Some(error);
            self.total_restarts.fetch_add(1, Ordering::Relaxed);
            true
        })
        .unwrap_or(false)
    }

    pub fn pane_ids(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.key().clone()).collect()
    }

    pub fn snapshots(&self) -> Vec<WorkerSnapshot> {
        let mut out: Vec<WorkerSnapshot> = self.workers.iter().map(|w| w.value().snapshot()).collect();
        out.sort_by(|a, b| a.pane_id.cmp(&b.pane_id));
        out
    }

    pub fn workers(&self) -> Vec<WorkerProcess> {
        self.workers.iter().map(|w| w.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn total_restarts(&self) -> u64 {
        self.total_restarts.load(Ordering::Relaxed)
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
