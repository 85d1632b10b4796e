//! Error taxonomy for the acquisition service.
//!
//! Mirrors the error kinds enumerated in the specification: most variants
//! never reach a client (they are logged and degraded at the point they
//! occur); only [`AcquisitionError::MalformedRequest`] and
//! [`AcquisitionError::Storage`] are surfaced synchronously as HTTP
//! responses.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Missing/invalid `deploymentKey`, non-semver `appVersion`, or a
    /// missing required body field. Surfaced as HTTP 400.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The release-history backend failed. Surfaced via the shared
    /// error handler below.
    #[error("storage error: {0}")]
    Storage(String),

    /// The distributed cache failed. Never surfaced to the caller;
    /// treated as a miss (reads) or swallowed (writes).
    #[error("cache error: {0}")]
    Cache(String),

    /// Diff-map fetch failed. Never surfaced; the full-bundle URL is
    /// returned instead.
    #[error("diff hydration error: {0}")]
    DiffHydration(String),

    /// Counter update failed. Never surfaced; logged only.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Malformed proxy URL or blob URL. Logged; falls back to the
    /// original URL.
    #[error("proxy rewrite error: {0}")]
    ProxyRewrite(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for AcquisitionError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            AcquisitionError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "MALFORMED_REQUEST"),
            AcquisitionError::Storage(_) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR"),
            // These kinds are designed to be handled before they ever
            // become a response; if one escapes, answer 500 rather than
            // panic.
            AcquisitionError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            AcquisitionError::DiffHydration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DIFF_HYDRATION_ERROR"),
            AcquisitionError::Metrics(_) => (StatusCode::INTERNAL_SERVER_ERROR, "METRICS_ERROR"),
            AcquisitionError::ProxyRewrite(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROXY_REWRITE_ERROR"),
        };

        let body = ErrorBody {
            error: code.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
