use fcode_types::{FcodeError, FcodeResult, WorkerStatus};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::cancellation::{CancellationSource, CancellationToken};
use super::manager::WorkerManager;
use super::stats::SupervisorStats;
use crate::channel::{CommandChannel, WorkerCommandChannel};
use crate::config::DaemonConfig;
use crate::health::HealthMonitor;
use crate::ipc::SocketServer;
use crate::metrics::{CpuStats, ErrorStats, HealthMetrics, ResponseTimeStats};
use crate::registry::WorkerSnapshot;

const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Composition of worker manager, health monitor, control socket and command channel.
pub struct Supervisor {
    config: DaemonConfig,
    manager: Arc<WorkerManager>,
    channel: Arc<dyn CommandChannel>,
    cancel: CancellationSource,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Supervisor {
    /// Supervisor whose control socket executes commands against its own workers.
    pub fn new(config: DaemonConfig) -> Self {
        let manager = Arc::new(
            WorkerManager::new(config.supervisor.clone(), config.worker.clone())
                .with_supervisor_socket(config.ipc.socket_path.clone()),
        );
        let channel: Arc<dyn CommandChannel> =
            Arc::new(WorkerCommandChannel::new(Arc::clone(&manager)));
        Self::with_channel(config, manager, channel)
    }

    pub fn with_channel(
        config: DaemonConfig,
        manager: Arc<WorkerManager>,
        channel: Arc<dyn CommandChannel>,
    ) -> Self {
        Self {
            config,
            manager,
            channel,
            cancel: CancellationSource::new(),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<WorkerManager> {
        &self.manager
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.ipc.socket_path
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst)
    }

    /// Starts the command channel, the control socket, the health monitor and
    /// the channel probe, in that order.
    pub async fn start(&self) -> FcodeResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(FcodeError::Internal("supervisor has been stopped".into()));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(FcodeError::Internal("supervisor already started".into()));
        }

        self.channel.start().await?;

        let server = match SocketServer::bind(&self.config.ipc) {
            Ok(server) => server,
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                let _ = self.channel.close().await;
                return Err(e.into());
            }
        };
        self.spawn_task(
            "control-socket",
            server.serve(Arc::clone(&self.channel), self.cancel.token()),
        );

        let monitor = HealthMonitor::new(Arc::clone(&self.manager), self.cancel.token());
        self.spawn_task("health-monitor", async move { monitor.run().await });

        self.spawn_task(
            "channel-probe",
            probe_channel(
                Arc::clone(&self.channel),
                self.config.supervisor.probe_interval(),
                self.config.supervisor.health_check_timeout(),
                self.cancel.token(),
            ),
        );

        info!(
            "Supervisor started (channel '{}', socket {})",
            self.channel.name(),
            self.config.ipc.socket_path.display()
        );
        Ok(())
    }

    /// Cancels background loops, closes the channel, removes the socket and
    /// stops every worker. Later calls are no-ops.
    pub async fn stop(&self) -> FcodeResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Stopping supervisor");

        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        join_tasks(tasks, TASK_SHUTDOWN_TIMEOUT).await;

        if let Err(e) = self.channel.close().await {
            warn!("Failed to close command channel: {}", e);
        }
        self.manager.stop_all().await;

        info!("Supervisor stopped");
        Ok(())
    }

    pub async fn start_worker(&self, pane_id: &str, working_dir: impl AsRef<Path>) -> bool {
        self.manager.start_worker(pane_id, working_dir).await
    }

    pub async fn stop_worker(&self, pane_id: &str) -> bool {
        self.manager.stop_worker(pane_id).await
    }

    pub async fn restart_worker(&self, pane_id: &str) -> FcodeResult<()> {
        self.manager.restart_worker(pane_id).await
    }

    pub fn record_heartbeat(&self, pane_id: &str) -> bool {
        self.manager.record_heartbeat(pane_id)
    }

    pub fn get_worker_status(&self, pane_id: &str) -> Option<WorkerStatus> {
        self.manager.get_worker_status(pane_id)
    }

    pub fn get_worker_metrics(&self, pane_id: &str) -> Option<HealthMetrics> {
        self.manager.get_worker_metrics(pane_id)
    }

    pub fn get_all_workers(&self) -> Vec<WorkerSnapshot> {
        self.manager.get_all_workers()
    }

    pub fn cpu_stats(&self, pane_id: &str) -> Option<CpuStats> {
        self.manager.cpu_stats(pane_id)
    }

    pub fn response_time_stats(&self, pane_id: &str) -> Option<ResponseTimeStats> {
        self.manager.response_time_stats(pane_id)
    }

    pub fn error_stats(&self, pane_id: &str) -> Option<ErrorStats> {
        self.manager.error_stats(pane_id)
    }

    pub fn stats(&self) -> SupervisorStats {
        self.manager.stats()
    }

    fn spawn_task<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!("Spawning supervisor task '{}'", name);
        self.tasks.lock().push((name, tokio::spawn(future)));
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("channel", &self.channel.name())
            .field("socket", &self.config.ipc.socket_path)
            .field("workers", &self.manager.registry().len())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Waits for each task up to `timeout`, aborting those that overrun so
/// nothing keeps acting on workers after shutdown.
async fn join_tasks(tasks: Vec<(&'static str, JoinHandle<()>)>, timeout: Duration) {
    for (name, mut handle) in tasks {
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => debug!("Task '{}' stopped", name),
            Ok(Err(e)) if e.is_cancelled() => debug!("Task '{}' cancelled", name),
            Ok(Err(e)) => warn!("Task '{}' panicked: {}", name, e),
            Err(_) => {
                warn!("Task '{}' did not stop within {:?}, aborting", name, timeout);
                handle.abort();
            }
        }
    }
}

async fn probe_channel(
    channel: Arc<dyn CommandChannel>,
    every: Duration,
    timeout: Duration,
    mut cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match tokio::time::timeout(timeout, channel.probe()).await {
                    Ok(Ok(())) => debug!("Channel '{}' healthy", channel.name()),
                    Ok(Err(e)) => warn!("Channel '{}' probe failed: {}", channel.name(), e),
                    Err(_) => warn!("Channel '{}' probe timed out after {:?}", channel.name(), timeout),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_join_tasks_aborts_overrunning_task() {
        let steps = Arc::new(AtomicUsize::new(0));

        let quick = tokio::spawn(async {});
        let counter = Arc::clone(&steps);
        let stuck = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        join_tasks(
            vec![("quick", quick), ("stuck", stuck)],
            Duration::from_millis(100),
        )
        .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let after_join = steps.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(steps.load(Ordering::SeqCst), after_join);
    }
}
