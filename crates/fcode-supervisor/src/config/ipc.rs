use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::constants::{DEFAULT_LISTEN_BACKLOG, DEFAULT_REQUEST_TIMEOUT_MS};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    pub socket_path: PathBuf,
    pub backlog: u32,
    pub request_timeout_ms: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: std::env::temp_dir().join(fcode_types::SUPERVISOR_SOCKET_NAME),
            backlog: DEFAULT_LISTEN_BACKLOG,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl IpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
