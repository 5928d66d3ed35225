//! Headless Pitwall runner: receives the telemetry feed, reports liveness,
//! optionally logs CSV rows, and can fire one-shot control commands.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pitwall_control::{CommandRegistry, CommandValue, ControlSession};
use pitwall_ingest_ac::AcSource;
use pitwall_ingest_core::{channel, ConnectionMonitor, SnapshotStore, TelemetrySource};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::DashboardConfig;

#[derive(Debug, Parser)]
#[command(name = "pitwall", version, about = "Assetto Corsa telemetry dashboard core")]
struct Cli {
    /// Path to the JSON config; created with defaults if missing.
    #[arg(long, default_value = "pitwall.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Receive telemetry until Ctrl-C.
    Run,
    /// Send a single control command, e.g. `send tc_level 3`.
    Send { command: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = DashboardConfig::load(&cli.config)?;

    match cli.cmd {
        Command::Run => run(cfg).await,
        Command::Send { command, value } => send(cfg, &command, &value).await,
    }
}

async fn run(cfg: DashboardConfig) -> Result<()> {
    let store = Arc::new(SnapshotStore::new());
    let (monitor, conn_events) = ConnectionMonitor::channel();
    let monitor = Arc::new(monitor);

    let source = AcSource::bind(cfg.ac_config(), store.clone(), monitor.clone())
        .await
        .context("bind telemetry socket")?;

    let (tx, rx) = channel();
    let (stop_tx, stop_rx) = watch::channel(false);

    let logger = if cfg.logging.enabled {
        let mut log = pitwall_io::SnapshotLog::create(Path::new(&cfg.logging.directory))
            .context("open telemetry log")?;
        info!(path = %log.path().display(), "logging telemetry");
        Some(std::thread::spawn(move || {
            while let Ok(snapshot) = rx.recv() {
                if let Err(err) = log.append(&snapshot) {
                    warn!("telemetry log write failed: {err}");
                    break;
                }
            }
        }))
    } else {
        drop(rx);
        None
    };

    std::thread::spawn(move || {
        for state in conn_events {
            info!(?state, "telemetry feed");
        }
    });

    let receiver = tokio::spawn(async move { source.run(tx, stop_rx).await });

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("shutting down");
    let _ = stop_tx.send(true);
    receiver.await?.context("telemetry receiver")?;
    if let Some(handle) = logger {
        let _ = handle.join();
    }
    Ok(())
}

async fn send(cfg: DashboardConfig, command: &str, value: &str) -> Result<()> {
    if !cfg.control.enabled {
        bail!("control channel is disabled in the config");
    }

    let session = ControlSession::connect(cfg.control_config(), CommandRegistry::default())
        .await
        .context("open control socket")?;
    let value = parse_value(value)?;
    session.send(command, value).await?;
    info!(command, "command sent");
    Ok(())
}

/// CLI values: true/false/on/off parse as booleans, whole numbers as
/// integers, anything else numeric as a float.
fn parse_value(raw: &str) -> Result<CommandValue> {
    match raw {
        "true" | "on" => return Ok(CommandValue::Bool(true)),
        "false" | "off" => return Ok(CommandValue::Bool(false)),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i32>() {
        return Ok(CommandValue::Int(int));
    }
    if let Ok(float) = raw.parse::<f32>() {
        return Ok(CommandValue::Float(float));
    }
    bail!("cannot interpret {raw:?} as a command value")
}
