use super::commands::OutputFormat;
use super::utils::{failure, format_bytes, format_uptime, success};
use fcode_supervisor::{ControlCommand, ControlResponse, DaemonConfig, SupervisorClient};
use fcode_types::{FcodeError, FcodeResult};

/// Sends one command to a running supervisor and prints the reply.
pub async fn send_command(
    config: &DaemonConfig,
    command: ControlCommand,
    format: OutputFormat,
) -> FcodeResult<()> {
    let socket = &config.ipc.socket_path;
    let mut client = SupervisorClient::connect(socket, config.ipc.request_timeout())
        .await
        .map_err(|e| {
            FcodeError::Ipc(format!(
                "Cannot reach supervisor at {}: {}",
                socket.display(),
                e
            ))
        })?;

    let response = client.request(command).await?;
    print_response(&response, format)?;

    match response {
        ControlResponse::Error { code, message } => {
            Err(FcodeError::Channel(format!("{:?}: {}", code, message)))
        }
        _ => Ok(()),
    }
}

fn print_response(response: &ControlResponse, format: OutputFormat) -> FcodeResult<()> {
    if let OutputFormat::Json = format {
        let json = serde_json::to_string_pretty(response)
            .map_err(|e| FcodeError::Serialization(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    match response {
        ControlResponse::Pong {
            version,
            uptime_secs,
        } => {
            success(&format!(
                "Supervisor v{} is up ({})",
                version,
                format_uptime(*uptime_secs)
            ));
        }
        ControlResponse::Status { stats } => {
            println!("Uptime:        {}", format_uptime(stats.uptime_secs));
            println!("Workers:       {}", stats.total_workers);
            println!("  starting:    {}", stats.starting_workers);
            println!("  running:     {}", stats.running_workers);
            println!("  unhealthy:   {}", stats.unhealthy_workers);
            println!("  crashed:     {}", stats.crashed_workers);
            println!("  stopping:    {}", stats.stopping_workers);
            println!("Intervention:  {}", stats.awaiting_intervention);
            println!("Restarts:      {}", stats.total_restarts);
        }
        ControlResponse::Workers { workers } => {
            if workers.is_empty() {
                println!("\x1b[38;5;245mNo workers\x1b[0m");
            } else {
                println!(
                    "{:<16} {:<10} {:>8} {:>9}  {}",
                    "PANE", "STATUS", "PID", "RESTARTS", "DIRECTORY"
                );
                for w in workers {
                    println!(
                        "{:<16} {:<10} {:>8} {:>9}  {}",
                        w.pane_id,
                        w.status,
                        w.pid,
                        w.restart_count,
                        w.working_dir.display()
                    );
                }
            }
        }
        ControlResponse::WorkerStatus { worker } => {
            println!("Pane:       {}", worker.pane_id);
            println!("Status:     {}", worker.status);
            println!("PID:        {}", worker.pid);
            println!("Session:    {}", worker.session_id);
            println!("Restarts:   {}", worker.restart_count);
            println!("Heartbeat:  {}", worker.last_heartbeat);
            if let Some(ref reason) = worker.manual_intervention {
                println!("\x1b[38;5;196mNeeds manual intervention:\x1b[0m {}", reason);
            }
        }
        ControlResponse::Metrics {
            health,
            cpu,
            response_time,
            errors,
        } => {
            println!("Pane:          {}", health.pane_id);
            println!("Status:        {}", health.status);
            println!("Uptime:        {}", format_uptime(health.uptime_secs));
            println!(
                "Memory:        {} ({})",
                format_bytes(health.memory_bytes),
                health.memory_trend
            );
            println!(
                "CPU:           {:.1}% (avg {:.1}%, peak {:.1}%)",
                cpu.current, cpu.average, cpu.peak
            );
            match response_time.last_ms {
                Some(last) => println!(
                    "Response:      {:.1} ms (avg {:.1} ms over {})",
                    last, response_time.average_ms, response_time.samples
                ),
                None => println!("Response:      -"),
            }
            println!(
                "Errors:        {} (ipc {}, crash {}, timeout {}, other {})",
                errors.total, errors.ipc, errors.crash, errors.timeout, errors.other
            );
            println!(
                "Error rate:    {}{}/h",
                errors.rate_per_hour,
                if errors.window_saturated { "+" } else { "" }
            );
            println!("Restarts:      {}", health.restart_count);
        }
        ControlResponse::Ack { message } => {
            success(message.as_deref().unwrap_or("ok"));
        }
        ControlResponse::Measurement { elapsed_ms } => {
            println!("{:.1} ms", elapsed_ms);
        }
        ControlResponse::Error { message, .. } => {
            failure(message);
        }
    }

    Ok(())
}
