//! Mass CLI - headless command-line client for the music server.
//!
//! Connects over the websocket API, waits for the server handshake and then
//! runs one subcommand: print the handshake, issue a command (with or
//! without waiting for its result) or stream server events until Ctrl+C.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mass_core::{CommandArgs, ConnectionState, MassClient};
use serde_json::Value;
use tokio::signal;

use crate::config::CliConfig;

/// Mass CLI - command-line client for the music server.
#[derive(Parser, Debug)]
#[command(name = "mass-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "MASS_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Server base URL or websocket URL (overrides config file).
    #[arg(short, long, env = "MASS_SERVER_URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server handshake as JSON.
    Info,

    /// Send a command and print its result.
    Call {
        /// Command path, e.g. `players/all`.
        command: String,

        /// Arguments as a JSON object.
        #[arg(long, value_name = "JSON")]
        args: Option<String>,

        /// Result timeout (defaults to the configured command timeout).
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Send a command without waiting for a result; prints its message id.
    Send {
        command: String,

        /// Arguments as a JSON object.
        #[arg(long, value_name = "JSON")]
        args: Option<String>,
    },

    /// Print server events as JSON lines until Ctrl+C.
    Events {
        /// Only print these event names (repeatable).
        #[arg(long = "filter", value_name = "NAME")]
        filters: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Mass CLI v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(server) = args.server {
        config.server_url = Some(server);
    }

    let server_url = config.server_url.clone().context(
        "No server configured. Pass --server, set MASS_SERVER_URL or add server_url \
         to the config file.",
    )?;
    log::info!(
        "Configuration: server_url={}, ready_timeout_ms={}, command_timeout_ms={}",
        server_url,
        config.ready_timeout_ms,
        config.command_timeout_ms
    );

    let client = Arc::new(
        MassClient::websocket(config.to_client_config()).context("Invalid client configuration")?,
    );
    client
        .connect(&server_url)
        .await
        .with_context(|| format!("Failed to connect to {server_url}"))?;
    client
        .await_ready_default()
        .await
        .context("Server did not complete the handshake")?;

    let result = run(&client, args.command).await;

    client.disconnect().await;
    log::debug!("Disconnected");
    result
}

async fn run(client: &MassClient, command: Command) -> Result<()> {
    match command {
        Command::Info => {
            let info = client
                .server_info()
                .context("Handshake received but no server info cached")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Call {
            command,
            args,
            timeout_ms,
        } => {
            let args = parse_args(args.as_deref())?;
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(client.config().command_timeout);
            let result = client
                .send_command_awaiting_result(&command, args, timeout)
                .await
                .with_context(|| format!("Command {command} failed"))?;
            let result = result.unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Send { command, args } => {
            let args = parse_args(args.as_deref())?;
            let id = client
                .send_command(&command, args)
                .await
                .with_context(|| format!("Failed to send {command}"))?;
            println!("{id}");
        }
        Command::Events { filters } => stream_events(client, filters).await?,
    }
    Ok(())
}

async fn stream_events(client: &MassClient, filters: Vec<String>) -> Result<()> {
    let mut events = client.subscribe_events();
    if !filters.is_empty() {
        events = events.only(&filters);
    }
    let mut state = client.watch_state();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    log::info!("Streaming events, press Ctrl+C to stop");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown signal received");
                break;
            }
            _ = state.wait_for(|s| *s == ConnectionState::Disconnected) => {
                log::warn!("Connection to server lost");
                break;
            }
            event = events.recv() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
        }
    }
    Ok(())
}

/// Parses `--args` into command arguments. `null` means no arguments.
fn parse_args(raw: Option<&str>) -> Result<Option<CommandArgs>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw).context("--args is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
