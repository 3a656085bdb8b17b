//! Logger module
//!
//! Installs the `tracing` subscriber and keeps the few log lines that have a
//! fixed shape:
//! - Server lifecycle logging
//! - Access logging with multiple formats (target `access`)

mod format;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Target used for access log lines, so they can be filtered separately
pub const ACCESS_TARGET: &str = "access";

/// Initialize the logger with configuration
///
/// `RUST_LOG` wins over `logging.level`. Should be called once at startup.
pub fn init(config: &Config) -> Result<(), TryInitError> {
    let level = config.logging.level.to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, media_root: &Path) {
    info!("======================================");
    info!("HTTP media server started");
    info!("Listening on: http://{addr}");
    info!("Serving: {}", media_root.display());
    info!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        info!("Max connections: {max}");
    }
    if config.http.enable_api {
        info!("Health check: http://{addr}/health");
        info!("API info: http://{addr}/api/info");
    }
    info!("======================================");
}

pub fn log_shutdown_requested(signal: &str) {
    info!("Received {signal}, shutting down");
}

pub fn log_server_stopped() {
    info!("Server stopped");
}

pub fn log_connection_error(peer_addr: &SocketAddr, err: &impl std::fmt::Display) {
    error!(peer = %peer_addr, "Failed to serve connection: {err}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
