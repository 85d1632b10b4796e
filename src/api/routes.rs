//! Route table for the acquisition HTTP surface (spec §6): each
//! operation is exposed twice, once under its legacy camelCase path and
//! once under the new snake_case `v0.1` path, sharing the same handler
//! logic and differing only in wire-format casing.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    health, report_deploy_legacy, report_deploy_new, report_download_legacy, report_download_new,
    update_check_legacy, update_check_new,
};
use super::middleware::{cors_layer, trace_layer};
use super::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/updateCheck", get(update_check_legacy))
        .route("/v0.1/public/codepush/update_check", get(update_check_new))
        .route("/reportStatus/deploy", post(report_deploy_legacy))
        .route(
            "/v0.1/public/codepush/report_status/deploy",
            post(report_deploy_new),
        )
        .route("/reportStatus/download", post(report_download_legacy))
        .route(
            "/v0.1/public/codepush/report_status/download",
            post(report_download_new),
        )
        .layer(trace_layer())
        .layer(cors_layer())
        .with_state(state)
}
