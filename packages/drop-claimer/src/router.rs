//! HTTP router setup.

use crate::handlers;
use crate::middleware;
use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    let writes = Router::new()
        .route(
            "/claim",
            get(handlers::claim_state)
                .post(handlers::claim)
                .delete(handlers::dismiss_claim),
        )
        .route(
            "/session",
            get(handlers::session)
                .put(handlers::sign_in)
                .delete(handlers::sign_out),
        )
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/condition", get(handlers::condition))
        .route("/balance", get(handlers::balance))
        .route("/activity", get(handlers::activity))
        .merge(writes)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::inject_request_id))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
