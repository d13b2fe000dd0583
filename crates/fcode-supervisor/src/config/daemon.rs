use fcode_types::{FcodeError, FcodeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::ipc::IpcConfig;
use super::logging::LoggingConfig;
use super::supervisor::SupervisorConfig;
use super::types::LogLevel;
use super::worker::WorkerConfig;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub supervisor: SupervisorConfig,
    pub worker: WorkerConfig,
    pub ipc: IpcConfig,
    pub logging: LoggingConfig,
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> FcodeResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| FcodeError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| FcodeError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> FcodeResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FcodeError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FcodeError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| FcodeError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("FCODE_SOCKET_DIR") {
            let dir = PathBuf::from(dir);
            self.ipc.socket_path = dir.join(fcode_types::SUPERVISOR_SOCKET_NAME);
            self.worker.socket_dir = dir;
        }

        if let Ok(command) = std::env::var("FCODE_WORKER_COMMAND") {
            self.worker.command = command;
        }

        if let Ok(ms) = std::env::var("FCODE_HEARTBEAT_MS") {
            match ms.parse() {
                Ok(v) => self.supervisor.heartbeat_interval_ms = v,
                Err(_) => warn!("Ignoring invalid FCODE_HEARTBEAT_MS: {}", ms),
            }
        }

        if let Ok(mb) = std::env::var("FCODE_MEMORY_LIMIT_MB") {
            match mb.parse::<u64>() {
                Ok(v) => self.supervisor.memory_limit_bytes = megabytes_to_bytes(v),
                Err(_) => warn!("Ignoring invalid FCODE_MEMORY_LIMIT_MB: {}", mb),
            }
        }

        if let Ok(cpu) = std::env::var("FCODE_CPU_LIMIT") {
            match cpu.parse() {
                Ok(v) => self.supervisor.cpu_limit_percent = v,
                Err(_) => warn!("Ignoring invalid FCODE_CPU_LIMIT: {}", cpu),
            }
        }

        if let Ok(level) = std::env::var("FCODE_LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&level).unwrap_or(LogLevel::Info);
        }

        if std::env::var("FCODE_LOG_JSON").is_ok() {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> FcodeResult<()> {
        let s = &self.supervisor;

        if s.heartbeat_interval_ms == 0 {
            return Err(FcodeError::Config("heartbeat_interval_ms must be non-zero".into()));
        }

        if s.memory_limit_bytes == 0 {
            return Err(FcodeError::Config("memory_limit_bytes must be non-zero".into()));
        }

        if !(s.cpu_limit_percent > 0.0 && s.cpu_limit_percent <= 100.0) {
            return Err(FcodeError::Config(format!(
                "cpu_limit_percent must be in (0, 100], got {}",
                s.cpu_limit_percent
            )));
        }

        if s.max_restarts == 0 {
            return Err(FcodeError::Config("max_restarts must be at least 1".into()));
        }

        if self.worker.command.trim().is_empty() {
            return Err(FcodeError::Config("worker.command must not be empty".into()));
        }

        if self.ipc.backlog == 0 {
            return Err(FcodeError::Config("ipc.backlog must be non-zero".into()));
        }

        if self.ipc.socket_path.as_os_str().is_empty() {
            return Err(FcodeError::Config("ipc.socket_path must not be empty".into()));
        }

        Ok(())
    }
}

/// Saturates instead of overflowing on absurd values.
fn megabytes_to_bytes(mb: u64) -> u64 {
    mb.checked_mul(1024 * 1024).unwrap_or_else(|| {
        warn!("FCODE_MEMORY_LIMIT_MB={} overflows, using {} bytes", mb, u64::MAX);
        u64::MAX
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_megabytes_to_bytes() {
        assert_eq!(megabytes_to_bytes(2048), 2 * 1024 * 1024 * 1024);
        assert_eq!(megabytes_to_bytes(0), 0);
        assert_eq!(megabytes_to_bytes(u64::MAX), u64::MAX);
        assert_eq!(megabytes_to_bytes(u64::MAX / (1024 * 1024) + 1), u64::MAX);
    }
}
