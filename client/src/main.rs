//! Device Agent Client - Entry Point
//!
//! Runs a single device agent action and prints the result as JSON.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use devagent::errors::AgentError;
use devagent::logs::{init_logging, LogLevel, LogOptions};
use devagent::settings::Settings;
use devagent::utils::version_info;
use devagent::{DeviceApi, DeviceApiExt};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const USAGE: &str = "usage: device-agent-client [--config=PATH] [--address=HOST] [--port=PORT] \
[--log-level=LEVEL] [--max-attempts=N] <ping|version|info|status|target-state|set-target-state --file=PATH|\
container-id --service=NAME|logs>";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    let mut command: Option<String> = None;

    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        } else if command.is_none() {
            command = Some(arg);
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") && command.is_none() {
        let version = version_info();
        return match serde_json::to_string_pretty(&version) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let settings = match load_settings(&cli_args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let Some(command) = command else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let api = match DeviceApi::new(settings.client_options()) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to create device agent client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        await_shutdown_signal().await;
        token.cancel();
    });

    let api = api.with_cancellation(cancel.clone());
    info!("Running '{}' against {:?}", command, api.address());

    match run_command(&api, &command, &cli_args, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("'{}' failed: {}", command, e);
            ExitCode::FAILURE
        }
    }
}

/// Settings file (if any) with command line overrides applied
async fn load_settings(cli_args: &HashMap<String, String>) -> Result<Settings, AgentError> {
    let mut settings = match cli_args.get("config") {
        Some(path) => Settings::load(path).await?,
        None => Settings::default(),
    };

    if let Some(address) = cli_args.get("address") {
        settings.device.host = address.clone();
    }
    if let Some(port) = cli_args.get("port") {
        settings.device.port = port
            .parse()
            .map_err(|_| AgentError::UsageError(format!("invalid port: {port}")))?;
    }
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level.parse::<LogLevel>().map_err(AgentError::UsageError)?;
    }
    if let Some(attempts) = cli_args.get("max-attempts") {
        settings.retry.max_attempts = attempts
            .parse()
            .map_err(|_| AgentError::UsageError(format!("invalid max attempts: {attempts}")))?;
    }

    Ok(settings)
}

async fn run_command(
    api: &DeviceApi,
    command: &str,
    cli_args: &HashMap<String, String>,
    cancel: &CancellationToken,
) -> Result<(), AgentError> {
    match command {
        "ping" => {
            api.ping().await?;
            print_json(&serde_json::json!({ "ok": true }))
        }
        "version" => {
            let version = api.get_version().await?;
            print_json(&serde_json::json!({ "version": version }))
        }
        "info" => print_json(&api.get_device_information().await?),
        "status" => print_json(&api.get_status().await?),
        "target-state" => print_json(&api.get_target_state().await?),
        "set-target-state" => {
            let path = cli_args
                .get("file")
                .ok_or_else(|| AgentError::UsageError("--file=PATH is required".to_string()))?;
            let contents = tokio::fs::read_to_string(path).await?;
            let state: Value = serde_json::from_str(&contents)?;
            api.set_target_state(&state).await?;
            info!("Target state applied from {}", path);
            Ok(())
        }
        "container-id" => {
            let service = cli_args
                .get("service")
                .ok_or_else(|| AgentError::UsageError("--service=NAME is required".to_string()))?;
            let container_id = api.get_container_id(service).await?;
            print_json(&serde_json::json!({ "containerId": container_id }))
        }
        "logs" => follow_logs(api, cancel).await,
        other => Err(AgentError::UsageError(format!(
            "unknown command '{other}'\n{USAGE}"
        ))),
    }
}

async fn follow_logs(api: &DeviceApi, cancel: &CancellationToken) -> Result<(), AgentError> {
    let mut logs = api.get_log_stream().await?;

    let result = loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            line = logs.next_line() => line,
        };
        match line {
            Some(Ok(line)) => println!("{line}"),
            Some(Err(e)) => break Err(AgentError::from(e)),
            None => break Ok(()),
        }
    };

    logs.close();
    result
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AgentError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers");
                    return std::future::pending::<()>().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
    }
}
