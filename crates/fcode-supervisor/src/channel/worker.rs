use async_trait::async_trait;
use fcode_types::{FcodeError, FcodeResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::commands::{ControlCommand, ControlResponse, ErrorCode};
use super::CommandChannel;
use crate::metrics::UNKNOWN_REQUEST;
use crate::supervisor::WorkerManager;

/// Executes control commands directly against the worker manager.
pub struct WorkerCommandChannel {
    manager: Arc<WorkerManager>,
    started: AtomicBool,
    closed: AtomicBool,
}

impl WorkerCommandChannel {
    pub fn new(manager: Arc<WorkerManager>) -> Self {
        Self {
            manager,
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    async fn execute(&self, command: ControlCommand) -> ControlResponse {
        let manager = &self.manager;
        match command {
            ControlCommand::Ping => ControlResponse::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: manager.stats().uptime_secs,
            },
            ControlCommand::Status => ControlResponse::Status {
                stats: manager.stats(),
            },
            ControlCommand::ListWorkers => ControlResponse::Workers {
                workers: manager.get_all_workers(),
            },
            ControlCommand::WorkerStatus { pane_id } => match manager.get_worker(&pane_id) {
                Some(worker) => ControlResponse::WorkerStatus { worker },
                None => not_found(&pane_id),
            },
            ControlCommand::WorkerMetrics { pane_id } => {
                let metrics = manager.get_worker_metrics(&pane_id).and_then(|health| {
                    Some(ControlResponse::Metrics {
                        health,
                        cpu: manager.cpu_stats(&pane_id)?,
                        response_time: manager.response_time_stats(&pane_id)?,
                        errors: manager.error_stats(&pane_id)?,
                    })
                });
                metrics.unwrap_or_else(|| not_found(&pane_id))
            }
            ControlCommand::StartWorker {
                pane_id,
                working_dir,
            } => {
                if manager.registry().contains(&pane_id) {
                    return ControlResponse::error(
                        ErrorCode::WorkerExists,
                        format!("Worker {} is already running", pane_id),
                    );
                }
                if manager.start_worker(&pane_id, &working_dir).await {
                    ControlResponse::ack(format!("Started worker {}", pane_id))
                } else {
                    ControlResponse::error(
                        ErrorCode::StartFailed,
                        format!("Failed to start worker {}", pane_id),
                    )
                }
            }
            ControlCommand::StopWorker { pane_id } => {
                if manager.stop_worker(&pane_id).await {
                    ControlResponse::ack(format!("Stopped worker {}", pane_id))
                } else {
                    not_found(&pane_id)
                }
            }
            ControlCommand::RestartWorker { pane_id } => match manager.restart_worker(&pane_id).await {
                Ok(()) => ControlResponse::ack(format!("Restarted worker {}", pane_id)),
                Err(FcodeError::WorkerNotFound(_)) => not_found(&pane_id),
                Err(e) => ControlResponse::error(ErrorCode::RestartFailed, e.to_string()),
            },
            ControlCommand::Heartbeat { pane_id } => {
                if manager.record_heartbeat(&pane_id) {
                    ControlResponse::Ack { message: None }
                } else {
                    not_found(&pane_id)
                }
            }
            ControlCommand::StartMeasurement {
                pane_id,
                request_id,
            } => {
                if manager.start_measurement(&pane_id, &request_id) {
                    ControlResponse::Ack { message: None }
                } else {
                    not_found(&pane_id)
                }
            }
            ControlCommand::CompleteMeasurement {
                pane_id,
                request_id,
            } => match manager.complete_measurement(&pane_id, &request_id) {
                Some(elapsed_ms) if elapsed_ms == UNKNOWN_REQUEST => ControlResponse::error(
                    ErrorCode::UnknownRequest,
                    format!("No measurement in progress for {}", request_id),
                ),
                Some(elapsed_ms) => ControlResponse::Measurement { elapsed_ms },
                None => not_found(&pane_id),
            },
            ControlCommand::RecordError { pane_id, message } => {
                if manager.record_error(&pane_id, &message) {
                    ControlResponse::Ack { message: None }
                } else {
                    not_found(&pane_id)
                }
            }
        }
    }
}

fn not_found(pane_id: &str) -> ControlResponse {
    ControlResponse::error(ErrorCode::WorkerNotFound, format!("Unknown worker {}", pane_id))
}

#[async_trait]
impl CommandChannel for WorkerCommandChannel {
    fn name(&self) -> &str {
        "workers"
    }

    async fn start(&self) -> FcodeResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FcodeError::Channel("channel already closed".into()));
        }
        self.started.store(true, Ordering::SeqCst);
        debug!("Command channel '{}' started", self.name());
        Ok(())
    }

    async fn send(&self, command: ControlCommand) -> FcodeResult<ControlResponse> {
        if !self.started.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
            return Err(FcodeError::Channel(format!(
                "channel '{}' is not accepting commands",
                self.name()
            )));
        }
        debug!("Executing {:?}", command);
        Ok(self.execute(command).await)
    }

    async fn probe(&self) -> FcodeResult<()> {
        if self.started.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FcodeError::Channel(format!("channel '{}' is down", self.name())))
        }
    }

    async fn close(&self) -> FcodeResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Command channel '{}' closed", self.name());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{SupervisorConfig, WorkerConfig};
    use fcode_types::WorkerStatus;
    use std::time::Duration;

    fn channel(dir: &std::path::Path) -> WorkerCommandChannel {
        let worker = WorkerConfig {
            command: "sleep".into(),
            args: vec!["600".into()],
            socket_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let config = SupervisorConfig {
            stop_grace_ms: 500,
            ..Default::default()
        };
        WorkerCommandChannel::new(Arc::new(WorkerManager::new(config, worker)))
    }

    #[tokio::test]
    async fn test_rejects_commands_before_start_and_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(dir.path());

        assert!(channel.send(ControlCommand::Ping).await.is_err());
        assert!(channel.probe().await.is_err());

        channel.start().await.unwrap();
        assert!(matches!(
            channel.send(ControlCommand::Ping).await.unwrap(),
            ControlResponse::Pong { .. }
        ));
        assert!(channel.probe().await.is_ok());

        channel.close().await.unwrap();
        assert!(channel.send(ControlCommand::Ping).await.is_err());
        assert!(channel.start().await.is_err());
    }

    #[tokio::test]
    async fn test_worker_commands() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(dir.path());
        channel.start().await.unwrap();

        let start = ControlCommand::StartWorker {
            pane_id: "dev1".into(),
            working_dir: dir.path().to_path_buf(),
        };
        assert!(!channel.send(start.clone()).await.unwrap().is_error());
        match channel.send(start).await.unwrap() {
            ControlResponse::Error { code, .. } => assert_eq!(code, ErrorCode::WorkerExists),
            other => panic!("unexpected {:?}", other),
        }

        match channel
            .send(ControlCommand::WorkerStatus { pane_id: "dev1".into() })
            .await
            .unwrap()
        {
            ControlResponse::WorkerStatus { worker } => {
                assert_eq!(worker.status, WorkerStatus::Starting)
            }
            other => panic!("unexpected {:?}", other),
        }

        channel
            .send(ControlCommand::StartMeasurement {
                pane_id: "dev1".into(),
                request_id: "r1".into(),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        match channel
            .send(ControlCommand::CompleteMeasurement {
                pane_id: "dev1".into(),
                request_id: "r1".into(),
            })
            .await
            .unwrap()
        {
            ControlResponse::Measurement { elapsed_ms } => assert!(elapsed_ms >= 20.0),
            other => panic!("unexpected {:?}", other),
        }

        match channel
            .send(ControlCommand::WorkerMetrics { pane_id: "dev1".into() })
            .await
            .unwrap()
        {
            ControlResponse::Metrics { health, response_time, .. } => {
                assert_eq!(health.pane_id, "dev1");
                assert_eq!(response_time.samples, 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(!channel
            .send(ControlCommand::StopWorker { pane_id: "dev1".into() })
            .await
            .unwrap()
            .is_error());
        match channel
            .send(ControlCommand::Heartbeat { pane_id: "dev1".into() })
            .await
            .unwrap()
        {
            ControlResponse::Error { code, .. } => assert_eq!(code, ErrorCode::WorkerNotFound),
            other => panic!("unexpected {:?}", other),
        }
    }
}
