use fcode_supervisor::{DaemonConfig, Supervisor};
use fcode_types::{FcodeError, FcodeResult};
use std::path::PathBuf;
use tracing::{error, info, warn};

pub async fn run_supervisor(config: DaemonConfig, panes: &[String]) -> FcodeResult<()> {
    let panes = panes
        .iter()
        .map(|spec| parse_pane(spec))
        .collect::<FcodeResult<Vec<_>>>()?;

    info!("Starting fcode supervisor v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Worker command: {} {}",
        config.worker.command,
        config.worker.args.join(" ")
    );

    let supervisor = Supervisor::new(config);
    supervisor.start().await?;

    for (pane, dir) in &panes {
        if !supervisor.start_worker(pane, dir).await {
            warn!("Worker {} did not start", pane);
        }
    }
    info!(
        "Supervising {} worker(s) on {}",
        supervisor.get_all_workers().len(),
        supervisor.socket_path().display()
    );

    wait_for_shutdown().await;

    info!("Shutting down...");
    supervisor.stop().await?;
    info!("Shutdown complete");
    Ok(())
}

/// `NAME=DIR`; a bare `NAME` runs in the current directory.
pub fn parse_pane(spec: &str) -> FcodeResult<(String, PathBuf)> {
    let (name, dir) = match spec.split_once('=') {
        Some((name, dir)) => (name.trim(), PathBuf::from(dir)),
        None => (
            spec.trim(),
            std::env::current_dir()
                .map_err(|e| FcodeError::Config(format!("Cannot resolve current directory: {}", e)))?,
        ),
    };

    if name.is_empty() {
        return Err(FcodeError::Config(format!("Invalid pane spec '{}'", spec)));
    }
    if name.contains('/') {
        return Err(FcodeError::Config(format!("Pane name '{}' must not contain '/'", name)));
    }
    Ok((name.to_string(), dir))
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => { info!("Received SIGTERM"); }
                    _ = sigint.recv() => { info!("Received SIGINT"); }
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => error!("Failed to wait for Ctrl+C: {}", e),
    }
}
