//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::any::Any;
use std::sync::Arc;

use axum::body::HttpBody;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use ihub_auth::ValidationClient;
use ihub_store::PolicyStore;

use crate::error::GatewayError;
use crate::handlers::{gateway, health};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `ANY /:module/*endpoint` - Gateway pipeline
///
/// Any other path is answered with `RouteNotFound`.
pub fn create_router<S, V>(state: GatewayState<S, V>) -> Router
where
    S: PolicyStore + 'static,
    V: ValidationClient + 'static,
{
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;

    let cors = build_cors_layer(&cors_origins);
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/:module/*endpoint", any(gateway::proxy::<S, V>))
        .fallback(gateway::not_found)
        // Middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    max_body_bytes,
                    reject_oversized,
                ))
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    }
}

/// Refuse a request whose declared body size is over `limit`.
///
/// Bodies of unknown length are cut off by `RequestBodyLimitLayer` while
/// they are read.
async fn reject_oversized(State(limit): State<usize>, request: Request, next: Next) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| request.body().size_hint().exact());

    match declared {
        Some(len) if len > limit as u64 => GatewayError::PayloadTooLarge.into_response(),
        _ => next.run(request).await,
    }
}

/// Render a panicked request as an internal error envelope.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Request task panicked");

    GatewayError::Internal("request failed unexpectedly".to_string()).into_response()
}
