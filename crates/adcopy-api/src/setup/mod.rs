//! Application setup: storage, state, and routes.

pub mod routes;
pub mod server;

use std::sync::Arc;

use adcopy_core::Config;
use axum::Router;

use crate::state::AppState;

/// Build the shared state and the router from configuration.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    crate::error::set_production_mode(config.is_production());

    let gateway = adcopy_storage::create_gateway(&config).await?;
    tracing::info!(
        backend = %gateway.storage().backend_type(),
        public_base_url = %gateway.public_base_url(),
        signed_urls = gateway.requires_signature(),
        "Storage gateway initialized"
    );

    let state = Arc::new(AppState::new(config.clone(), gateway));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
