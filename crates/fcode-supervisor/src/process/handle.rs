use fcode_types::{FcodeError, FcodeResult};
use parking_lot::Mutex;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tracing::{debug, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Owned handle to one spawned worker process.
pub struct ProcessHandle {
    pid: u32,
    child: Mutex<Child>,
    exit_status: Mutex<Option<ExitStatus>>,
}

impl ProcessHandle {
    pub(crate) fn new(pid: u32, child: Child) -> Self {
        Self {
            pid,
            child: Mutex::new(child),
            exit_status: Mutex::new(None),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Reaps the child if it has exited.
    pub fn is_alive(&self) -> bool {
        if self.exit_status.lock().is_some() {
            return false;
        }

        match self.child.lock().try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("Process {} exited with {}", self.pid, status);
                *self.exit_status.lock() = Some(status);
                false
            }
            Err(e) => {
                warn!("Failed to poll process {}: {}", self.pid, e);
                false
            }
        }
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit_status.lock()
    }

    /// Asks the process to exit (SIGTERM).
    pub fn terminate(&self) -> FcodeResult<()> {
        if !self.is_alive() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = i32::try_from(self.pid)
                .map_err(|_| FcodeError::Process(format!("pid {} out of range", self.pid)))?;
            match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) => Ok(()),
                Err(nix::errno::Errno::ESRCH) => Ok(()),
                Err(e) => Err(FcodeError::Process(format!(
                    "Failed to signal process {}: {}",
                    self.pid, e
                ))),
            }
        }

        #[cfg(not(unix))]
        {
            self.kill()
        }
    }

    pub fn kill(&self) -> FcodeResult<()> {
        if !self.is_alive() {
            return Ok(());
        }
        self.child
            .lock()
            .start_kill()
            .map_err(|e| FcodeError::Process(format!("Failed to kill process {}: {}", self.pid, e)))
    }

    /// Returns `true` if the process exited before `timeout` elapsed.
    pub async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_alive() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// SIGTERM, wait up to `grace`, then SIGKILL. Returns `true` if the process is gone.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if let Err(e) = self.terminate() {
            warn!("{}", e);
        }

        if self.wait_for_exit(grace).await {
            return true;
        }

        warn!("Process {} ignored SIGTERM for {:?}, killing", self.pid, grace);
        if let Err(e) = self.kill() {
            warn!("{}", e);
        }
        self.wait_for_exit(Duration::from_secs(1)).await
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("exit_status", &self.exit_status())
            .finish()
    }
}
