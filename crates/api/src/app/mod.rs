//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, catalog service, bus -> SSE fan-out
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tracing::warn;

use citycat_infra::StoreResult;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> StoreResult<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router_with(services, config.admin_token.clone()))
}

/// Router over already-wired services.
pub fn router_with(services: Arc<services::AppServices>, admin_token: Option<String>) -> Router {
    if admin_token.is_none() {
        warn!("CITYCAT_ADMIN_TOKEN not set; admin API is unauthenticated");
    }
    let auth_state = middleware::AuthState {
        token: admin_token.map(Arc::from),
    };

    // Protected routes: require the admin bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
