use super::*;
use crate::config::SupervisorConfig;
use chrono::{Duration as ChronoDuration, Utc};
use fcode_types::{ProcessError, RecoveryStrategy};

fn input(alive: bool, silent_ms: i64, memory: u64, cpu: f64) -> HealthInput {
    HealthInput {
        is_alive: alive,
        last_heartbeat: Utc::now() - ChronoDuration::milliseconds(silent_ms),
        memory_bytes: memory,
        cpu_percent: cpu,
    }
}

#[test]
fn test_healthy_worker() {
    let config = SupervisorConfig::default();
    let verdict = evaluate(&input(true, 100, 1024, 5.0), &config, Utc::now());
    assert!(verdict.is_healthy());
}

#[test]
fn test_exited_process_is_unhealthy_regardless_of_metrics() {
    let config = SupervisorConfig::default();
    let verdict = evaluate(
        &input(false, 0, config.memory_limit_bytes * 4, 0.0),
        &config,
        Utc::now(),
    );
    assert!(!verdict.is_healthy());
    assert!(matches!(classify(&verdict), ProcessError::UnresponsiveProcess(_)));
}

#[test]
fn test_silence_threshold_is_three_heartbeats() {
    let config = SupervisorConfig {
        heartbeat_interval_ms: 1000,
        ..Default::default()
    };
    let now = Utc::now();

    let quiet = evaluate(&input(true, 2_500, 0, 0.0), &config, now);
    assert!(quiet.is_responsive);

    let silent = evaluate(&input(true, 3_500, 0, 0.0), &config, now);
    assert!(!silent.is_responsive);
    match classify(&silent) {
        ProcessError::UnresponsiveProcess(ms) => assert!(ms >= 3_500),
        other => panic!("unexpected classification {:?}", other),
    }
}

#[test]
fn test_memory_over_limit_is_resource_exhaustion() {
    let config = SupervisorConfig {
        memory_limit_bytes: 1000,
        ..Default::default()
    };
    let verdict = evaluate(&input(true, 0, 1000, 0.0), &config, Utc::now());
    assert!(!verdict.is_memory_ok);
    assert_eq!(
        classify(&verdict),
        ProcessError::ResourceExhaustion("Memory".into())
    );
}

#[test]
fn test_cpu_over_limit_is_unhealthy() {
    let config = SupervisorConfig::default();
    let verdict = evaluate(&input(true, 0, 0, 95.0), &config, Utc::now());
    assert!(!verdict.is_cpu_ok);
    assert!(!verdict.is_healthy());
}

#[test]
fn test_recovery_table() {
    let startup = ProcessError::StartupFailure("boom".into());
    let memory = ProcessError::ResourceExhaustion("Memory".into());
    let silent = ProcessError::UnresponsiveProcess(20_000);

    assert_eq!(
        select_recovery_strategy(&startup, 0),
        RecoveryStrategy::DelayedRestart(STARTUP_RETRY_DELAY_MS)
    );
    assert_eq!(
        select_recovery_strategy(&startup, 2),
        RecoveryStrategy::DelayedRestart(5_000)
    );
    assert_eq!(
        select_recovery_strategy(&startup, 3),
        RecoveryStrategy::FallbackToSafeMode
    );
    assert_eq!(select_recovery_strategy(&memory, 4), RecoveryStrategy::ImmediateRestart);
    assert_eq!(select_recovery_strategy(&silent, 0), RecoveryStrategy::ImmediateRestart);
    assert_eq!(select_recovery_strategy(&silent, 4), RecoveryStrategy::ImmediateRestart);
    assert_eq!(
        select_recovery_strategy(&ProcessError::NetworkConnectivityLoss, 0),
        RecoveryStrategy::FallbackToSafeMode
    );
    assert_eq!(
        select_recovery_strategy(&ProcessError::CommunicationFailure("idle".into()), 1),
        RecoveryStrategy::FallbackToSafeMode
    );
}

#[test]
fn test_custom_restart_limit() {
    let policy = RecoveryPolicy::new(2);
    assert_eq!(
        policy.select(&ProcessError::UnresponsiveProcess(0), 2),
        RecoveryStrategy::ManualIntervention(MAX_RESTARTS_REASON.into())
    );
}

mod props {
    use super::*;
    use proptest::prelude::*;

    fn any_error() -> impl Strategy<Value = ProcessError> {
        prop_oneof![
            ".*".prop_map(ProcessError::StartupFailure),
            ".*".prop_map(ProcessError::CommunicationFailure),
            ".*".prop_map(ProcessError::ResourceExhaustion),
            any::<u64>().prop_map(ProcessError::UnresponsiveProcess),
            ".*".prop_map(ProcessError::CorruptedSession),
            Just(ProcessError::NetworkConnectivityLoss),
        ]
    }

    proptest! {
        #[test]
        fn prop_restart_limit_always_wins(error in any_error(), count in 5u32..1000) {
            prop_assert_eq!(
                select_recovery_strategy(&error, count),
                RecoveryStrategy::ManualIntervention(MAX_RESTARTS_REASON.into())
            );
        }

        #[test]
        fn prop_selection_is_deterministic(error in any_error(), count in 0u32..10) {
            prop_assert_eq!(
                select_recovery_strategy(&error, count),
                select_recovery_strategy(&error, count)
            );
        }
    }
}

#[cfg(unix)]
mod lifecycle {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::supervisor::{CancellationSource, WorkerManager};
    use fcode_types::WorkerStatus;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn manager(config: SupervisorConfig, dir: &Path) -> Arc<WorkerManager> {
        let worker = WorkerConfig {
            command: "sleep".into(),
            args: vec!["600".into()],
            socket_dir: dir.to_path_buf(),
            ..Default::default()
        };
        Arc::new(WorkerManager::new(config, worker))
    }

    /// Workers that ignore SIGTERM, so every shutdown waits out the grace period.
    fn stubborn_manager(config: SupervisorConfig, dir: &Path) -> Arc<WorkerManager> {
        let worker = WorkerConfig {
            command: "sh".into(),
            args: vec!["-c".into(), "trap '' TERM; exec sleep 600".into()],
            socket_dir: dir.to_path_buf(),
            ..Default::default()
        };
        Arc::new(WorkerManager::new(config, worker))
    }

    fn restart_pending(manager: &WorkerManager, pane_id: &str) -> bool {
        manager
            .registry()
            .get(pane_id)
            .is_some_and(|w| w.restart_pending.load(Ordering::Acquire))
    }

    /// Waits for the restart task of `pane_id` to finish.
    async fn settle(manager: &WorkerManager, pane_id: &str, within: Duration) {
        tokio::time::timeout(within, async {
            while restart_pending(manager, pane_id) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            heartbeat_interval_ms: 60_000,
            stop_grace_ms: 500,
            ..Default::default()
        }
    }

    async fn kill_hard(pid: u32) {
        kill(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn test_killed_worker_is_restarted() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(fast_config(), dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);
        assert_eq!(manager.get_worker_status("dev1"), Some(WorkerStatus::Starting));

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::Healthy));
        let worker = manager.get_worker("dev1").unwrap();
        assert_eq!(worker.status, WorkerStatus::Running);
        assert_eq!(worker.restart_count, 0);

        let old_pid = worker.pid;
        let old_session = worker.session_id.clone();
        kill_hard(old_pid).await;

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::RestartScheduled(0)));
        assert_eq!(monitor.tick().await.outcome("dev1"), Some(&WorkerOutcome::Skipped));
        settle(&manager, "dev1", Duration::from_secs(5)).await;

        let worker = manager.get_worker("dev1").unwrap();
        assert_eq!(worker.restart_count, 1);
        assert_ne!(worker.pid, old_pid);
        assert_ne!(worker.session_id, old_session);
        assert_eq!(worker.status, WorkerStatus::Starting);

        // Error history survives the restart.
        assert_eq!(manager.error_stats("dev1").unwrap().timeout, 1);

        assert!(manager.stop_worker("dev1").await);
    }

    #[tokio::test]
    async fn test_restart_limit_requires_manual_intervention() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(fast_config(), dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);
        manager.registry().update("dev1", |w| w.restart_count = 5);
        kill_hard(manager.get_worker("dev1").unwrap().pid).await;

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::ManualIntervention));

        let worker = manager.get_worker("dev1").unwrap();
        assert_eq!(worker.status, WorkerStatus::Crashed);
        assert_eq!(worker.manual_intervention.as_deref(), Some(MAX_RESTARTS_REASON));
        assert_eq!(worker.restart_count, 5);

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::Skipped));

        manager.restart_worker("dev1").await.unwrap();
        let worker = manager.get_worker("dev1").unwrap();
        assert!(worker.manual_intervention.is_none());
        assert_eq!(worker.status, WorkerStatus::Starting);
        assert_eq!(worker.restart_count, 6);

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_silent_worker_is_restarted() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            heartbeat_interval_ms: 50,
            ..fast_config()
        };
        let manager = manager(config, dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);
        let old_pid = manager.get_worker("dev1").unwrap().pid;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::RestartScheduled(0)));
        settle(&manager, "dev1", Duration::from_secs(5)).await;
        assert_ne!(manager.get_worker("dev1").unwrap().pid, old_pid);

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_worker_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            heartbeat_interval_ms: 50,
            ..fast_config()
        };
        let manager = manager(config, dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(manager.record_heartbeat("dev1"));

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::Healthy));
        assert!(!manager.record_heartbeat("missing"));

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_cooldown_defers_second_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            restart_cooldown_ms: 60_000,
            ..fast_config()
        };
        let manager = manager(config, dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);

        kill_hard(manager.get_worker("dev1").unwrap().pid).await;
        assert_eq!(
            monitor.tick().await.outcome("dev1"),
            Some(&WorkerOutcome::RestartScheduled(0))
        );
        settle(&manager, "dev1", Duration::from_secs(5)).await;

        kill_hard(manager.get_worker("dev1").unwrap().pid).await;
        assert_eq!(
            monitor.tick().await.outcome("dev1"),
            Some(&WorkerOutcome::CoolingDown)
        );
        assert_eq!(manager.get_worker_status("dev1"), Some(WorkerStatus::Crashed));
        assert_eq!(manager.get_worker("dev1").unwrap().restart_count, 1);

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_failed_restart_schedules_delayed_retry() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(fast_config(), dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);
        let generation = manager.get_worker("dev1").unwrap().generation;
        assert!(manager.registry().record_failed_restart(
            "dev1",
            generation,
            ProcessError::StartupFailure("no such file".into()),
        ));

        let report = monitor.tick().await;
        assert_eq!(
            report.outcome("dev1"),
            Some(&WorkerOutcome::RestartScheduled(STARTUP_RETRY_DELAY_MS))
        );

        let report = monitor.tick().await;
        assert_eq!(report.outcome("dev1"), Some(&WorkerOutcome::Skipped));

        source.cancel();
        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_preventive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            preventive_restart_secs: 1,
            ..fast_config()
        };
        let manager = manager(config, dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        assert!(manager.start_worker("dev1", dir.path()).await);
        assert_eq!(monitor.tick().await.outcome("dev1"), Some(&WorkerOutcome::Healthy));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            monitor.tick().await.outcome("dev1"),
            Some(&WorkerOutcome::PreventiveRestart)
        );
        settle(&manager, "dev1", Duration::from_secs(5)).await;
        assert_eq!(manager.get_worker("dev1").unwrap().restart_count, 1);

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_grace_periods_do_not_stall_the_tick() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            heartbeat_interval_ms: 50,
            stop_grace_ms: 1_500,
            ..Default::default()
        };
        let manager = stubborn_manager(config, dir.path());
        let source = CancellationSource::new();
        let monitor = HealthMonitor::new(Arc::clone(&manager), source.token());

        let panes = ["a", "b", "c", "d"];
        for pane in panes {
            assert!(manager.start_worker(pane, dir.path()).await);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        kill_hard(manager.get_worker("d").unwrap().pid).await;

        let started = Instant::now();
        let report = monitor.tick().await;
        let took = started.elapsed();

        assert!(took < Duration::from_secs(1), "tick took {:?}", took);
        for pane in panes {
            assert_eq!(report.outcome(pane), Some(&WorkerOutcome::RestartScheduled(0)));
        }

        // The crashed worker is replaced without waiting on the others' grace periods.
        settle(&manager, "d", Duration::from_secs(1)).await;
        assert_eq!(manager.get_worker("d").unwrap().restart_count, 1);

        // Cancelling abandons the restarts still waiting on SIGTERM.
        source.cancel();
        for pane in ["a", "b", "c"] {
            settle(&manager, pane, Duration::from_millis(500)).await;
            assert_eq!(manager.get_worker(pane).unwrap().restart_count, 0);
        }

        manager.stop_all().await;
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let config = SupervisorConfig {
            heartbeat_interval_ms: 20,
            ..fast_config()
        };
        let manager = manager(config, dir.path());
        let source = CancellationSource::new();
        let monitor = Arc::new(HealthMonitor::new(manager, source.token()));

        let running = Arc::clone(&monitor);
        let task = tokio::spawn(async move { running.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        source.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
