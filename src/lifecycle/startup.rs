//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, then the optional metrics exporter
//! - Build the client registry
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::{load_or_default, ConfigError, ResilienceConfig};
use crate::http::{ClientRegistry, RegistryError};
use crate::lifecycle::Shutdown;
use crate::observability::{init_logging, metrics, LoggingError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("clients: {0}")]
    Registry(#[from] RegistryError),
}

/// Everything a running process holds on to.
pub struct Started {
    pub config: ResilienceConfig,
    pub registry: ClientRegistry,
    pub shutdown: Shutdown,
    _log_guard: Option<WorkerGuard>,
}

/// Bring the process up from `config_path`, or built-in defaults.
pub fn start(config_path: Option<&Path>) -> Result<Started, StartupError> {
    let config = load_or_default(config_path)?;
    let log_guard = init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "outbound-resilience starting"
    );

    if config.metrics.enabled {
        let addr: SocketAddr = config
            .metrics
            .address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.metrics.address.clone()))?;
        metrics::init_metrics(addr);
    }

    let registry = ClientRegistry::from_config(&config)?;
    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    Ok(Started {
        config,
        registry,
        shutdown,
        _log_guard: log_guard,
    })
}
