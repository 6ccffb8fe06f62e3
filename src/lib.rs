pub mod api;
pub mod bucket;
pub mod config;
pub mod core_state;
pub mod db;
pub mod entry;
pub mod models;
pub mod query_cache;
pub mod stats;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigError};
use crate::core_state::{CoreError, CoreState};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("State error: {0}")]
    Core(#[from] CoreError),
    #[error("Server error: {0}")]
    Server(#[from] api::ServerError),
    #[error("Cannot listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Install the global tracing subscriber (`RUST_LOG` overrides the default filter).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Read config from the environment, serve until Ctrl-C, then shut down.
pub async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        "{} starting v{} (db: {})",
        config::APP_NAME,
        config::APP_VERSION,
        config.db_path.display()
    );

    let core = Arc::new(CoreState::from_config(&config)?);
    let mut server = api::start_api_server(core, config.bind).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    let signal = tokio::signal::ctrl_c().await.map_err(StartupError::Signal);
    server.shutdown();
    server.stopped().await;
    signal
}
