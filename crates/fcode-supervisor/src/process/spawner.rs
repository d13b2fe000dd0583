use fcode_types::{FcodeError, FcodeResult};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::trace;

use super::handle::ProcessHandle;

#[derive(Clone, Debug, Default)]
pub struct SpawnSpec {
    pub label: String,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

/// Spawns `spec` with stdin closed and stdout/stderr drained into trace logs.
///
/// Must be called from within a tokio runtime.
pub fn spawn(spec: &SpawnSpec) -> FcodeResult<ProcessHandle> {
    let mut cmd = Command::new(&spec.command);

    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(ref dir) = spec.working_dir {
        cmd.current_dir(dir);
    }

    for (k, v) in &spec.env {
        cmd.env(k, v);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| FcodeError::Spawn(format!("{}: {}", spec.command, e)))?;

    let pid = child
        .id()
        .ok_or_else(|| FcodeError::Spawn("failed to get process ID".to_string()))?;

    if let Some(stdout) = child.stdout.take() {
        drain(stdout, spec.label.clone(), "stdout");
    }
    if let Some(stderr) = child.stderr.take() {
        drain(stderr, spec.label.clone(), "stderr");
    }

    Ok(ProcessHandle::new(pid, child))
}

fn drain<R>(stream: R, label: String, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace!(pane = %label, stream = name, "{}", line);
        }
    });
}
