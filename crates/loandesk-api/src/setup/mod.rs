//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use loandesk_core::Config;
use loandesk_db::PgSubmissionStore;
use loandesk_infra::{init_telemetry, LogFormat};
use std::sync::Arc;

/// Connect everything and build the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    init_telemetry(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, Arc::new(PgSubmissionStore::new(pool)), storage)?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
