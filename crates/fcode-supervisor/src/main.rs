mod cli;

use clap::Parser;
use cli::{
    default_config_path, handle_config, init_logging, run_supervisor, send_command, Cli,
    Commands,
};
use fcode_supervisor::{ControlCommand, DaemonConfig};
use fcode_types::FcodeResult;

#[tokio::main]
async fn main() -> FcodeResult<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    if let Commands::Config { action } = &cli.command {
        return handle_config(&config_path, action.clone());
    }

    let mut config = DaemonConfig::load(&config_path)?;
    if let Some(ref socket) = cli.socket {
        config.ipc.socket_path = socket.clone();
    }
    init_logging(&cli, &config.logging)?;

    let format = cli.format;
    match cli.command {
        Commands::Run { panes } => {
            run_supervisor(config, &panes).await?;
        }
        Commands::Ping => {
            send_command(&config, ControlCommand::Ping, format).await?;
        }
        Commands::Status => {
            send_command(&config, ControlCommand::Status, format).await?;
        }
        Commands::Workers => {
            send_command(&config, ControlCommand::ListWorkers, format).await?;
        }
        Commands::Metrics { pane } => {
            send_command(&config, ControlCommand::WorkerMetrics { pane_id: pane }, format).await?;
        }
        Commands::Start { pane, dir } => {
            let working_dir = std::fs::canonicalize(&dir).unwrap_or(dir);
            send_command(
                &config,
                ControlCommand::StartWorker {
                    pane_id: pane,
                    working_dir,
                },
                format,
            )
            .await?;
        }
        Commands::Stop { pane } => {
            send_command(&config, ControlCommand::StopWorker { pane_id: pane }, format).await?;
        }
        Commands::Restart { pane } => {
            send_command(&config, ControlCommand::RestartWorker { pane_id: pane }, format).await?;
        }
        Commands::Heartbeat { pane } => {
            send_command(&config, ControlCommand::Heartbeat { pane_id: pane }, format).await?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
