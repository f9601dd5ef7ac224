//! Route configuration.

use crate::auth::basic_auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v2/catalog", get(handlers::get_catalog))
        .route(
            "/v2/service_instances/{instance_id}",
            put(handlers::provision_instance)
                .delete(handlers::deprovision_instance)
                .patch(handlers::update_instance),
        )
        .route(
            "/v2/service_instances/{instance_id}/last_operation",
            get(handlers::last_operation),
        )
        .route(
            "/v2/service_instances/{instance_id}/service_bindings/{binding_id}",
            put(handlers::create_binding).delete(handlers::remove_binding),
        )
        // Every broker endpoint requires the registered credentials.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            basic_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
