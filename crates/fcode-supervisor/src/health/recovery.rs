use fcode_types::{ProcessError, RecoveryStrategy};

use crate::config::DEFAULT_MAX_RESTARTS;

pub const STARTUP_RETRY_LIMIT: u32 = 3;
pub const STARTUP_RETRY_DELAY_MS: u64 = 5_000;
pub const MAX_RESTARTS_REASON: &str = "Max restart limit exceeded";

#[derive(Clone, Copy, Debug)]
pub struct RecoveryPolicy {
    max_restarts: u32,
}

impl RecoveryPolicy {
    pub fn new(max_restarts: u32) -> Self {
        Self { max_restarts }
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn select(&self, error: &ProcessError, restart_count: u32) -> RecoveryStrategy {
        if restart_count >= self.max_restarts {
            return RecoveryStrategy::ManualIntervention(MAX_RESTARTS_REASON.to_string());
        }

        match error {
            ProcessError::StartupFailure(_) if restart_count < STARTUP_RETRY_LIMIT => {
                RecoveryStrategy::DelayedRestart(STARTUP_RETRY_DELAY_MS)
            }
            ProcessError::ResourceExhaustion(_) => RecoveryStrategy::ImmediateRestart,
            ProcessError::UnresponsiveProcess(_) => RecoveryStrategy::ImmediateRestart,
            ProcessError::StartupFailure(_)
            | ProcessError::CommunicationFailure(_)
            | ProcessError::CorruptedSession(_)
            | ProcessError::NetworkConnectivityLoss => RecoveryStrategy::FallbackToSafeMode,
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESTARTS)
    }
}

/// Recovery choice under the default restart limit.
pub fn select_recovery_strategy(error: &ProcessError, restart_count: u32) -> RecoveryStrategy {
    RecoveryPolicy::default().select(error, restart_count)
}
