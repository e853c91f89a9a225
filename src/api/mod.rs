//! API module
//!
//! HTTP routes, middleware and the router assembly used by `main.rs` and the
//! integration tests.

pub mod handlers;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::websocket;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Request bodies may exceed the image limit so oversized uploads reach the
/// image check and get its message instead of a bare 413
const BODY_LIMIT_HEADROOM: usize = 4 * 1024 * 1024;

/// Request ID middleware - adds unique ID to each request for tracing
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Build the application router
pub fn router(orchestrator: Orchestrator, config: &Config) -> Router {
    let body_limit = config
        .upload
        .max_image_bytes
        .saturating_mul(2)
        .saturating_add(BODY_LIMIT_HEADROOM);

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/session", get(handlers::get_session))
        .route("/api/image", post(handlers::upload_image))
        .route("/api/diagnose", post(handlers::diagnose))
        .route("/api/language", put(handlers::set_language))
        .route("/api/chat", post(handlers::send_message))
        .route("/api/speak", post(handlers::speak))
        .route("/api/specialists", get(handlers::list_specialists))
        // Session events and speech for the browser
        .route("/ws", get(websocket::websocket_handler))
        // Middleware (order matters - request_id should be first)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for development
        .with_state(orchestrator)
}
