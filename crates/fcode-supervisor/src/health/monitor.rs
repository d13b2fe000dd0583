use chrono::{DateTime, Utc};
use fcode_types::{ProcessError, RecoveryStrategy, WorkerStatus};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use super::evaluator::{classify, evaluate, HealthInput};
use super::recovery::RecoveryPolicy;
use crate::registry::WorkerProcess;
use crate::supervisor::{CancellationToken, WorkerManager};

/// What one tick did with one worker. Restarts only ever get scheduled;
/// they complete on their own task.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerOutcome {
    Healthy,
    PreventiveRestart,
    Skipped,
    CoolingDown,
    RestartScheduled(u64),
    ManualIntervention,
    Unrecovered(RecoveryStrategy),
}

#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub outcomes: Vec<(String, WorkerOutcome)>,
}

impl TickReport {
    pub fn outcome(&self, pane_id: &str) -> Option<&WorkerOutcome> {
        self.outcomes
            .iter()
            .find(|(pane, _)| pane == pane_id)
            .map(|(_, outcome)| outcome)
    }

    pub fn healthy(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, WorkerOutcome::Healthy))
            .count()
    }
}

/// Periodic health evaluation and recovery for every registered worker.
pub struct HealthMonitor {
    manager: Arc<WorkerManager>,
    policy: RecoveryPolicy,
    cancel: CancellationToken,
}

impl HealthMonitor {
    pub fn new(manager: Arc<WorkerManager>, cancel: CancellationToken) -> Self {
        let policy = RecoveryPolicy::new(manager.config().max_restarts);
        Self {
            manager,
            policy,
            cancel,
        }
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Ticks every heartbeat interval until cancelled.
    pub async fn run(&self) {
        let interval = self.manager.config().heartbeat_interval();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cancel = self.cancel.clone();

        info!("Health monitor started (interval {:?})", interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    trace!("Health tick: {}/{} healthy", report.healthy(), report.outcomes.len());
                }
            }
        }
        info!("Health monitor stopped");
    }

    /// Evaluates every worker once.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        for pane_id in self.manager.registry().pane_ids() {
            let outcome = self.check_worker(&pane_id);
            debug!("Worker {}: {:?}", pane_id, outcome);
            report.outcomes.push((pane_id, outcome));
        }
        report
    }

    fn check_worker(&self, pane_id: &str) -> WorkerOutcome {
        let Some(worker) = self.manager.registry().get(pane_id) else {
            return WorkerOutcome::Skipped;
        };
        if worker.status == WorkerStatus::Stopping
            || worker.needs_manual_intervention()
            || worker.restart_pending.load(Ordering::Acquire)
        {
            return WorkerOutcome::Skipped;
        }

        let now = Utc::now();
        let error = match failed_startup(&worker) {
            Some(error) => error,
            None => {
                let sample = self.manager.sample(&worker);
                let verdict = evaluate(
                    &HealthInput {
                        is_alive: sample.is_alive,
                        last_heartbeat: worker.last_heartbeat,
                        memory_bytes: sample.memory_bytes.unwrap_or(0),
                        cpu_percent: sample.cpu_percent,
                    },
                    self.manager.config(),
                    now,
                );

                if verdict.is_healthy() {
                    return self.on_healthy(&worker, now);
                }

                let error = classify(&verdict);
                warn!(
                    "Worker {} unhealthy: {} (alive={}, responsive={}, memory_ok={}, cpu_ok={})",
                    pane_id,
                    error,
                    verdict.is_alive,
                    verdict.is_responsive,
                    verdict.is_memory_ok,
                    verdict.is_cpu_ok
                );
                self.mark_unhealthy(&worker, &error, verdict.is_alive);
                error
            }
        };

        if self.in_cooldown(&worker, now) {
            debug!("Worker {} restarted recently, waiting for cooldown", pane_id);
            return WorkerOutcome::CoolingDown;
        }

        let strategy = self.policy.select(&error, worker.restart_count);
        debug!("Worker {} recovery: {}", pane_id, strategy);
        self.execute(&worker, strategy)
    }

    fn on_healthy(&self, worker: &WorkerProcess, now: DateTime<Utc>) -> WorkerOutcome {
        let generation = worker.generation();
        if matches!(worker.status, WorkerStatus::Starting | WorkerStatus::Unhealthy) {
            self.manager.registry().update(&worker.pane_id, |w| {
                if w.generation() == generation && w.status == worker.status {
                    info!("Worker {} is running", w.pane_id);
                    w.status = WorkerStatus::Running;
                }
            });
        }

        let Some(max_uptime) = self.manager.config().preventive_restart_interval() else {
            return WorkerOutcome::Healthy;
        };
        if worker.incarnation.uptime_secs(now) < max_uptime.as_secs() {
            return WorkerOutcome::Healthy;
        }

        info!(
            "Worker {} reached {:?} uptime, restarting preventively",
            worker.pane_id, max_uptime
        );
        if self.spawn_restart(worker, 0) {
            WorkerOutcome::PreventiveRestart
        } else {
            WorkerOutcome::Skipped
        }
    }

    fn mark_unhealthy(&self, worker: &WorkerProcess, error: &ProcessError, alive: bool) {
        let generation = worker.generation();
        self.manager.registry().update(&worker.pane_id, |w| {
            if w.generation() != generation {
                return;
            }
            if !matches!(w.status, WorkerStatus::Unhealthy | WorkerStatus::Crashed) {
                w.errors.record_process_error(error);
            }
            w.status = if alive {
                WorkerStatus::Unhealthy
            } else {
                WorkerStatus::Crashed
            };
            w.last_error = Some(error.clone());
        });
    }

    fn in_cooldown(&self, worker: &WorkerProcess, now: DateTime<Utc>) -> bool {
        let cooldown = self.manager.config().restart_cooldown();
        if cooldown.is_zero() {
            return false;
        }
        worker.last_restart.is_some_and(|at| {
            (now - at)
                .to_std()
                .map(|elapsed| elapsed < cooldown)
                .unwrap_or(true)
        })
    }

    fn execute(&self, worker: &WorkerProcess, strategy: RecoveryStrategy) -> WorkerOutcome {
        let pane_id = worker.pane_id.as_str();
        let generation = worker.generation();

        match strategy {
            RecoveryStrategy::ImmediateRestart => self.schedule_restart(worker, 0),
            RecoveryStrategy::DelayedRestart(delay_ms) => self.schedule_restart(worker, delay_ms),
            RecoveryStrategy::ManualIntervention(reason) => {
                self.manager.registry().update(pane_id, |w| {
                    if w.generation() == generation {
                        w.status = WorkerStatus::Crashed;
                        w.manual_intervention = Some(reason.clone());
                    }
                });
                error!(
                    "Worker {} needs manual intervention after {} restarts: {}",
                    pane_id, worker.restart_count, reason
                );
                WorkerOutcome::ManualIntervention
            }
            RecoveryStrategy::FallbackToSafeMode => {
                warn!("Worker {}: safe mode is not available, leaving it as is", pane_id);
                WorkerOutcome::Unrecovered(strategy)
            }
            RecoveryStrategy::GracefulShutdown => {
                warn!("Worker {}: graceful shutdown requested, no action taken", pane_id);
                WorkerOutcome::Unrecovered(strategy)
            }
        }
    }

    fn schedule_restart(&self, worker: &WorkerProcess, delay_ms: u64) -> WorkerOutcome {
        if self.spawn_restart(worker, delay_ms) {
            WorkerOutcome::RestartScheduled(delay_ms)
        } else {
            WorkerOutcome::Skipped
        }
    }

    /// Restarts the current incarnation after `delay_ms` on its own task, so
    /// grace periods never hold up the tick. At most one restart is pending
    /// per worker; returns `false` if one already is.
    fn spawn_restart(&self, worker: &WorkerProcess, delay_ms: u64) -> bool {
        if worker
            .restart_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let manager = Arc::clone(&self.manager);
        let pending = Arc::clone(&worker.restart_pending);
        let pane_id = worker.pane_id.clone();
        let generation = worker.generation();
        let mut cancel = self.cancel.clone();

        if delay_ms > 0 {
            info!("Restarting worker {} in {} ms", pane_id, delay_ms);
        } else {
            debug!("Restarting worker {}", pane_id);
        }
        tokio::spawn(async move {
            let restart = async {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                if let Err(e) = manager.restart_incarnation(&pane_id, generation).await {
                    warn!("Restart of worker {} failed: {}", pane_id, e);
                }
            };
            // Dropping the restart mid-shutdown leaves the old incarnation
            // registered, so the stop path still reaps it.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Restart of worker {} cancelled", pane_id);
                }
                _ = restart => {}
            }
            pending.store(false, Ordering::Release);
        });

        true
    }
}

/// A restart whose spawn failed leaves the worker crashed on a dead
/// incarnation; that failure drives recovery instead of a fresh probe.
fn failed_startup(worker: &WorkerProcess) -> Option<ProcessError> {
    match (&worker.status, &worker.last_error) {
        (WorkerStatus::Crashed, Some(error @ ProcessError::StartupFailure(_))) => Some(error.clone()),
        _ => None,
    }
}
