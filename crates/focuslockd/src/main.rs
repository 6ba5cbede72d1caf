//! focuslockd - The focuslock background service
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - Enforcement scheduler
//! - IPC server and the presenter that speaks through it

mod presenter;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use focuslock_config::{load_config, Settings};
use focuslock_ipc::{IpcServer, ServerMessage};
use focuslock_store::{AuditEventType, SqliteStore};
use focuslock_util::{
    default_config_path, format_datetime_full, is_mock_time_active, SystemClock,
    FOCUSLOCK_DATA_DIR_ENV, FOCUSLOCK_SOCKET_ENV,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::presenter::IpcPresenter;
use crate::service::Service;

const DB_FILENAME: &str = "focuslockd.db";

/// focuslockd - App blocking with a delayed, held overlay
#[derive(Parser, Debug)]
#[command(name = "focuslockd")]
#[command(about = "Blocks locked and scheduled apps behind an overlay", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focuslock/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set FOCUSLOCK_SOCKET env var)
    #[arg(short, long, env = FOCUSLOCK_SOCKET_ENV)]
    socket: Option<PathBuf>,

    /// Data directory override (or set FOCUSLOCK_DATA_DIR env var)
    #[arg(short, long, env = FOCUSLOCK_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// A missing config file is not an error; the defaults apply.
fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        warn!(config_path = %path.display(), "No configuration file, using defaults");
        return Ok(Settings::default());
    }

    let settings = load_config(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    info!(
        config_path = %path.display(),
        locked_apps = settings.locked_apps.len(),
        "Configuration loaded"
    );

    Ok(settings)
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = load_settings(&args.config)?;

    let socket_path = args
        .socket
        .clone()
        .unwrap_or_else(|| settings.service.socket_path.clone());

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| settings.service.data_dir.clone());

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join(DB_FILENAME);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );
    info!(db_path = %db_path.display(), "Store initialized");

    let mut ipc = IpcServer::new(&socket_path);
    ipc.start().await?;
    let events = ipc.broadcaster();
    let presenter = Arc::new(IpcPresenter::new(events.clone()));

    let mut service = Service::new(settings, store, presenter, Arc::new(SystemClock), events)
        .context("Failed to initialize service")?;
    service.audit(AuditEventType::ServiceStarted);

    let ipc = Arc::new(ipc);
    let mut ipc_messages = ipc
        .take_message_receiver()
        .await
        .context("IPC message receiver already taken")?;

    let ipc_accept = ipc.clone();
    tokio::spawn(async move {
        if let Err(e) = ipc_accept.run().await {
            error!(error = %e, "IPC server error");
        }
    });

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    info!(socket_path = %socket_path.display(), "Service running");

    loop {
        let wakeup = service.next_wakeup();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, shutting down gracefully");
                break;
            }

            _ = sleep_for(wakeup) => {
                service.fire_due();
            }

            Some(msg) = ipc_messages.recv() => {
                handle_ipc_message(&mut service, &ipc, msg).await;
            }
        }
    }

    info!("Shutting down focuslockd");
    service.shutdown();
    service.audit(AuditEventType::ServiceStopped);
    ipc.shutdown();

    info!("Shutdown complete");
    Ok(())
}

async fn handle_ipc_message(service: &mut Service, ipc: &IpcServer, msg: ServerMessage) {
    match msg {
        ServerMessage::Request { client_id, request } => {
            let Some(client) = ipc.get_client_info(&client_id).await else {
                debug!(client_id = %client_id, "Request from departed client");
                return;
            };

            let response = service.handle_command(&client, request.request_id, request.command);

            if let Err(e) = ipc.send_response(&client_id, response).await {
                debug!(client_id = %client_id, error = %e, "Failed to send response");
            }
        }

        ServerMessage::ClientConnected { client_id, info } => {
            info!(
                client_id = %client_id,
                role = ?info.role,
                uid = ?info.uid,
                "Client connected"
            );

            service.audit(AuditEventType::ClientConnected {
                client_id: client_id.to_string(),
                role: format!("{:?}", info.role),
                uid: info.uid,
            });
        }

        ServerMessage::ClientDisconnected { client_id } => {
            debug!(client_id = %client_id, "Client disconnected");

            service.audit(AuditEventType::ClientDisconnected {
                client_id: client_id.to_string(),
            });
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "focuslockd starting");

    if is_mock_time_active() {
        warn!(
            mock_now = %format_datetime_full(&focuslock_util::now()),
            "Mock time is active; block expiries follow the shifted clock"
        );
    }

    run(args).await
}
