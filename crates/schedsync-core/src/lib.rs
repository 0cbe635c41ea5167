pub mod config;
pub mod error;

pub use config::{
    Config, CredentialBackend, CredentialsConfig, ScheduleApiConfig, ServerConfig, SyncConfig,
    ValidationResult,
};
pub use error::{AppError, AuthError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::{Context, Result};
use std::time::Duration;

/// Initialize logging for the sync agent.
///
/// Honors `RUST_LOG`; falls back to `info` when unset.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Schedsync core initialized");
    Ok(())
}

/// Shared HTTP client for the schedule API and the ingestion endpoint.
///
/// `timeout` of `None` keeps reqwest's default (no overall timeout).
pub fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("schedsync/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().context("Failed to build HTTP client")
}
