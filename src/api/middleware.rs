//! # API Middleware
//!
//! CORS and request tracing for the acquisition surface. Authentication,
//! rate limiting, and request-ID tracking live on the management REST
//! surface, which is out of scope here (spec §1) — mobile clients hit
//! this service unauthenticated, identified only by their deployment
//! key.

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Permissive CORS: the acquisition endpoints are read by web-embedded
/// mobile shells (Cordova/React Native webviews) from origins we don't
/// control ahead of time.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Structured per-request tracing spans (method, path, status, latency).
pub fn trace_layer() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
}
