mod client;
mod commands;
mod config_cmd;
mod run;
mod utils;

pub use client::send_command;
pub use commands::{Cli, Commands, ConfigAction, OutputFormat};
pub use config_cmd::handle_config;
pub use run::run_supervisor;
pub use utils::{default_config_path, init_logging};
