use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure observed on a supervised worker, fed to recovery selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProcessError {
    StartupFailure(String),
    CommunicationFailure(String),
    ResourceExhaustion(String),
    UnresponsiveProcess(u64),
    CorruptedSession(String),
    NetworkConnectivityLoss,
}

impl ProcessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcessError::CommunicationFailure(_) | ProcessError::NetworkConnectivityLoss => {
                ErrorCategory::Ipc
            }
            ProcessError::StartupFailure(_) | ProcessError::CorruptedSession(_) => {
                ErrorCategory::Crash
            }
            ProcessError::UnresponsiveProcess(_) => ErrorCategory::Timeout,
            ProcessError::ResourceExhaustion(_) => ErrorCategory::Other,
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::StartupFailure(reason) => write!(f, "startup failure: {}", reason),
            ProcessError::CommunicationFailure(state) => {
                write!(f, "communication failure (last state: {})", state)
            }
            ProcessError::ResourceExhaustion(resource) => {
                write!(f, "resource exhaustion: {}", resource)
            }
            ProcessError::UnresponsiveProcess(silent_ms) => {
                write!(f, "unresponsive for {}ms", silent_ms)
            }
            ProcessError::CorruptedSession(id) => write!(f, "corrupted session {}", id),
            ProcessError::NetworkConnectivityLoss => write!(f, "network connectivity lost"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RecoveryStrategy {
    ImmediateRestart,
    DelayedRestart(u64),
    FallbackToSafeMode,
    ManualIntervention(String),
    GracefulShutdown,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStrategy::ImmediateRestart => write!(f, "immediate restart"),
            RecoveryStrategy::DelayedRestart(ms) => write!(f, "restart in {}ms", ms),
            RecoveryStrategy::FallbackToSafeMode => write!(f, "fallback to safe mode"),
            RecoveryStrategy::ManualIntervention(reason) => {
                write!(f, "manual intervention ({})", reason)
            }
            RecoveryStrategy::GracefulShutdown => write!(f, "graceful shutdown"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Ipc,
    Crash,
    Timeout,
    Other,
}

impl ErrorCategory {
    /// Buckets a free-form error message by keyword.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if ["ipc", "socket", "pipe", "connection", "frame"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ErrorCategory::Ipc
        } else if ["timeout", "timed out", "unresponsive"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ErrorCategory::Timeout
        } else if ["crash", "exited", "killed", "signal", "panic"]
            .iter()
            .any(|k| lower.contains(k))
        {
            ErrorCategory::Crash
        } else {
            ErrorCategory::Other
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Ipc => write!(f, "ipc"),
            ErrorCategory::Crash => write!(f, "crash"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Other => write!(f, "other"),
        }
    }
}
