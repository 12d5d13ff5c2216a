//! Patchgate demo API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod contact_store;
mod contacts;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use patchgate_application::Enforcer;
use patchgate_core::AppError;
use patchgate_infrastructure::{InMemoryEnforcer, PolicyDocument};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api_config::ApiConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let enforcer: Arc<dyn Enforcer> = match &config.policy_path {
        Some(path) => {
            let document = PolicyDocument::load(path)?;
            info!(path = %path.display(), grants = document.grants.len(), "loaded policy");
            Arc::new(InMemoryEnforcer::from_policy(document))
        }
        None => {
            warn!("PATCHGATE_POLICY is not set, every request will be denied");
            Arc::new(InMemoryEnforcer::new())
        }
    };

    let app_state = AppState::new(enforcer, config.default_domain.clone())?;
    let app = api_router::build_router(app_state, config.body_limit_bytes);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "patchgate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
