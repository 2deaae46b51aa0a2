//! HTTP routing configuration
//!
//! # Route Structure
//!
//! - POST   /api/github/configure-repo - Connect a repository to a project
//! - GET    /api/github/setup-callback - GitHub App install callback
//! - GET    /api/health                - Health check
//! - GET    /setup                     - Setup page (errors)
//! - GET    /setup/complete            - Setup page (success)

use axum::{
    body::Body,
    http::{header, Method, Request},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};

use crate::{handlers, middleware as api_middleware, pages, AppState};

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

/// Create the complete router with all routes configured.
///
/// This function sets up:
/// - All endpoint routes
/// - CORS configuration for the API routes
/// - Request tracing
/// - Timeout handling for the setup pages and health check
///
/// The provisioning routes have no timeout: dropping a request part way
/// through would leave the callback without its redirect.
pub fn create_router(state: AppState) -> Router {
    // The web UI calls configure-repo from another origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
        .max_age(Duration::from_secs(3600));

    // Spans carry the path only: the callback query holds the state token
    // and the setup pages receive cookies
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::debug_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        })
        .on_response(DefaultOnResponse::new());

    // Configure request timeout (30 seconds)
    let timeout_layer = TimeoutLayer::new(Duration::from_secs(30));

    let provisioning = Router::new()
        .route(
            "/github/configure-repo",
            post(handlers::configure_repository),
        )
        .route("/github/setup-callback", get(handlers::setup_callback));

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        .layer(timeout_layer.clone())
        .merge(provisioning)
        .layer(cors);

    let setup_pages = Router::new()
        .route(handlers::SETUP_PATH, get(pages::setup_page))
        .route(handlers::SETUP_COMPLETE_PATH, get(pages::setup_complete_page))
        .layer(timeout_layer);

    Router::new()
        .nest("/api", api)
        .merge(setup_pages)
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(trace_layer)
        .with_state(state)
}
