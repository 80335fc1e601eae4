//! AuthForge API composition root: a thin demonstration binary wiring the
//! Login Orchestrator to `axum`. Input validation, error-to-status mapping
//! beyond the core's own error taxonomy, and a hardened HTTP contract are
//! intentionally out of scope here.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod state;

use authforge_core::AppError;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = api_config::ApiConfig::load()?;
    let pool = api_services::connect(&config.database_url).await?;
    let app_state = api_services::build_app_state(pool, &config)?;
    let app = api_router::build_router(app_state)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "authforge-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
