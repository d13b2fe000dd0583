use thiserror::Error;

#[derive(Error, Debug)]
pub enum FcodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    #[error("Worker already registered: {0}")]
    WorkerExists(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Command channel error: {0}")]
    Channel(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type FcodeResult<T> = Result<T, FcodeError>;

impl From<std::io::Error> for FcodeError {
    fn from(e: std::io::Error) -> Self {
        FcodeError::Internal(format!("I/O error: {}", e))
    }
}
