//! CLI command implementations.

pub mod account;
pub mod config;
pub mod status;
pub mod watch;

pub use account::{run_login, run_signup};
pub use config::run_config;
pub use status::run_status;
pub use watch::run_watch;

use anyhow::{Context, Result};
use std::sync::Arc;

use fellowship_auth::AuthEngine;
use fellowship_backend::RestGateway;
use fellowship_core::Config;

/// Start an engine against the configured backend.
pub(crate) fn start_engine(config: &Config) -> Result<AuthEngine> {
    let gateway = RestGateway::from_config(config)
        .context("Backend is not configured (run 'fellowship config init')")?;
    tracing::debug!(backend = gateway.base_url(), "Connecting to backend");
    Ok(AuthEngine::start(Arc::new(gateway), &config.auth))
}
