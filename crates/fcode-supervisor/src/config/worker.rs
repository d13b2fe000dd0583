use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::constants::DEFAULT_WORKER_COMMAND;

/// How each worker process is launched.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub socket_dir: PathBuf,
    pub env: HashMap<String, String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_WORKER_COMMAND.to_string(),
            args: Vec::new(),
            socket_dir: std::env::temp_dir(),
            env: HashMap::new(),
        }
    }
}

impl WorkerConfig {
    pub fn socket_path(&self, pane_id: &str) -> PathBuf {
        self.socket_dir.join(fcode_types::worker_socket_name(pane_id))
    }
}
