use super::commands::ConfigAction;
use super::utils::{failure, success};
use fcode_supervisor::DaemonConfig;
use fcode_types::{FcodeError, FcodeResult};
use std::path::Path;

pub fn handle_config(config_path: &Path, action: Option<ConfigAction>) -> FcodeResult<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let config = DaemonConfig::load(config_path)?;
            let content = toml::to_string_pretty(&config)
                .map_err(|e| FcodeError::Config(format!("Failed to serialize config: {}", e)))?;
            if !config_path.exists() {
                println!(
                    "\x1b[38;5;245m# No configuration file at {:?}; showing defaults\x1b[0m",
                    config_path
                );
            }
            println!("{}", content);
        }
        Some(ConfigAction::Init { force }) => {
            if config_path.exists() && !force {
                failure(&format!(
                    "Configuration already exists at {:?} (use --force to overwrite)",
                    config_path
                ));
                return Ok(());
            }
            DaemonConfig::default().save(config_path)?;
            success(&format!("Wrote default configuration to {:?}", config_path));
        }
        Some(ConfigAction::Validate) => match DaemonConfig::load(config_path) {
            Ok(_) => success("Configuration is valid"),
            Err(e) => {
                failure(&format!("Configuration error: {}", e));
                return Err(e);
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fcode").join("config.toml");

        handle_config(&path, Some(ConfigAction::Init { force: false })).unwrap();
        assert!(path.exists());
        handle_config(&path, Some(ConfigAction::Validate)).unwrap();

        std::fs::write(&path, "[supervisor]\nheartbeat_interval_ms = 0\n").unwrap();
        assert!(handle_config(&path, Some(ConfigAction::Validate)).is_err());

        handle_config(&path, Some(ConfigAction::Init { force: false })).unwrap();
        assert!(handle_config(&path, Some(ConfigAction::Validate)).is_err());

        handle_config(&path, Some(ConfigAction::Init { force: true })).unwrap();
        handle_config(&path, Some(ConfigAction::Validate)).unwrap();
    }
}
