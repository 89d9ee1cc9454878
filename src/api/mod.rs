// src/api/mod.rs

pub mod health;
pub mod mcp;

use axum::http::{header, HeaderName, Method};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// Streamable-HTTP surface: `/mcp` plus a liveness probe.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, SESSION_HEADER])
        .expose_headers([SESSION_HEADER]);

    Router::new()
        .route(
            "/mcp",
            get(mcp::method_not_allowed)
                .post(mcp::post_mcp_handler)
                .delete(mcp::method_not_allowed),
        )
        .route("/health", get(health::health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
