#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod error;
mod process;
mod worker;

pub use error::{FcodeError, FcodeResult};
pub use process::{ErrorCategory, ProcessError, RecoveryStrategy};
pub use worker::{MemoryTrend, WorkerStatus};

pub const PROTOCOL_VERSION: u32 = 1;

pub const MAX_FRAME_LEN: u32 = 10 * 1024 * 1024;

pub const FRAME_HEADER_LEN: usize = 4;

pub const SOCKET_PREFIX: &str = "fcode";

pub const SUPERVISOR_SOCKET_NAME: &str = "fcode-supervisor.sock";

pub const ENV_PANE_ID: &str = "FCODE_PANE_ID";

pub const ENV_SOCKET_PATH: &str = "FCODE_SOCKET_PATH";

pub const ENV_SUPERVISOR_SOCKET: &str = "FCODE_SUPERVISOR_SOCKET";

pub const ENV_SESSION_ID: &str = "FCODE_SESSION_ID";

/// Per-worker endpoint name, `fcode-{pane_id}.sock`.
pub fn worker_socket_name(pane_id: &str) -> String {
    format!("{}-{}.sock", SOCKET_PREFIX, pane_id)
}
