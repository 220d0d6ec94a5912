//! Router configuration for the trigger server.

use axum::{
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the router: GET status, POST run, CORS preflight handled by the
/// layer.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::status).post(handlers::run_scrape))
        .route("/healthz", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
