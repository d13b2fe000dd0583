use fcode_types::FcodeError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Truncated frame: expected {expected} bytes, got {received}")]
    TruncatedFrame { expected: usize, received: usize },

    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(u64),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u32),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type IpcResult<T> = Result<T, IpcError>;

impl From<IpcError> for FcodeError {
    fn from(e: IpcError) -> Self {
        match e {
            IpcError::Serialization(inner) => FcodeError::Serialization(inner.to_string()),
            other => FcodeError::Ipc(other.to_string()),
        }
    }
}
