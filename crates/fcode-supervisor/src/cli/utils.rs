use super::commands::Cli;
use fcode_supervisor::LoggingConfig;
use fcode_types::{FcodeError, FcodeResult};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging(cli: &Cli, logging: &LoggingConfig) -> FcodeResult<()> {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => logging.level.to_string(),
            1 => "info,fcode_supervisor=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let log_file = cli.log_file.as_ref().or(logging.file.as_ref());
    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FcodeError::Config(format!("Failed to open log file {:?}: {}", path, e)))?;
        let file_layer = fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false);
        if logging.json {
            subscriber.with(file_layer.json()).init();
        } else {
            subscriber.with(file_layer).init();
        }
    } else if logging.json {
        subscriber.with(fmt::layer().json()).init();
    } else {
        let stdout_layer = fmt::layer().with_target(cli.verbose >= 2);
        subscriber.with(stdout_layer).init();
    }

    Ok(())
}

/// `$XDG_CONFIG_HOME/fcode/config.toml`, falling back to the working directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("fcode"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

pub fn success(message: &str) {
    println!("\x1b[38;5;46m[+]\x1b[0m {}", message);
}

pub fn failure(message: &str) {
    eprintln!("\x1b[38;5;196m[-]\x1b[0m {}", message);
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
