use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "fcode-supervisor")]
#[command(version = BUILD_VERSION)]
#[command(about = "Keeps CLI agent workers alive and serves the fcode control socket")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", env = "FCODE_CONFIG", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, value_name = "PATH", env = "FCODE_SUPERVISOR_SOCKET", help = "Control socket path")]
    pub socket: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the supervisor in the foreground")]
    #[command(long_about = "Run the supervisor in the foreground.\n\nBinds the control socket, starts the health monitor and launches one worker per --pane until SIGINT or SIGTERM.")]
    Run {
        #[arg(long = "pane", value_name = "NAME=DIR", help = "Start a worker for this pane (repeatable)")]
        panes: Vec<String>,
    },

    #[command(about = "Check that the supervisor is reachable")]
    Ping,

    #[command(about = "Show supervisor status")]
    Status,

    #[command(about = "List supervised workers")]
    Workers,

    #[command(about = "Show health metrics for a worker")]
    Metrics {
        pane: String,
    },

    #[command(about = "Start a worker")]
    Start {
        pane: String,
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    #[command(about = "Stop a worker")]
    Stop {
        pane: String,
    },

    #[command(about = "Restart a worker and clear any manual-intervention mark")]
    Restart {
        pane: String,
    },

    #[command(about = "Record a heartbeat for a worker")]
    Heartbeat {
        pane: String,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Clone, Subcommand)]
pub enum ConfigAction {
    #[command(about = "Print the effective configuration")]
    Show,
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(short, long, help = "Overwrite an existing file")]
        force: bool,
    },
    #[command(about = "Validate the configuration file")]
    Validate,
}
