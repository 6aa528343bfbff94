//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: principal store, marketplace, background housekeeping
//! - `routes/`: route table + HTTP handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use thiserror::Error;
use tower::ServiceBuilder;

use giftmarket_auth::{AuthorizationPipeline, PrincipalStoreError, RouteTableError};
use giftmarket_marketplace::{Notifier, TracingNotifier};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route table is invalid: {0}")]
    Routes(#[from] RouteTableError),

    #[error("failed to create bootstrap admin: {0}")]
    BootstrapAdmin(#[from] PrincipalStoreError),
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, StartupError> {
    build_app_with_notifier(config, Arc::new(TracingNotifier)).await
}

/// Same as `build_app`, with a custom gift notifier.
pub async fn build_app_with_notifier(
    config: &ApiConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<Router, StartupError> {
    let services = Arc::new(services::build_services(config, notifier)?);
    services::spawn_session_purger(services.clone(), config.session_purge_interval);

    let auth_state = middleware::AuthState {
        pipeline: AuthorizationPipeline::new(
            services.principals.clone(),
            Arc::new(routes::route_table()?),
        ),
    };
    let table = auth_state.pipeline.routes();
    if table.is_empty() {
        tracing::warn!("route table is empty; every route requires authentication");
    }
    tracing::info!(routes = table.len(), "route table loaded");

    // Every matched route runs the authorization pipeline; unmatched paths
    // fall through to the default 404.
    let app = routes::router()
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(ServiceBuilder::new().layer(Extension(services)));

    Ok(app)
}
