//! Acquisition request handlers (spec §4.8): the tiered update-check
//! read path, the two report-status write paths, and `/health`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::cache::CachedResponse;
use crate::cachekey::build_cache_key;
use crate::error::AcquisitionError;
use crate::metrics::MetricStatus;
use crate::model::{build_cacheable_response, CacheableResponse, DiffMap};
use crate::selection::{select_update, DiffMapFetcher, UpdateCheckRequest};
use crate::version::normalize;

use super::responses::{UpdateCheckResponseLegacy, UpdateCheckResponseNew};
use super::state::AppState;

const SDK_VERSION_HEADER: &str = "x-codepush-sdk-version";

fn deserialize_bool_ci<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes")))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCheckQuery {
    #[serde(rename = "deploymentKey", alias = "deployment_key")]
    pub deployment_key: String,
    #[serde(rename = "appVersion", alias = "app_version")]
    pub app_version: String,
    #[serde(rename = "packageHash", alias = "package_hash", default)]
    pub package_hash: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "clientUniqueId", alias = "client_unique_id", default)]
    pub client_unique_id: Option<String>,
    #[serde(
        rename = "isCompanion",
        alias = "is_companion",
        default,
        deserialize_with = "deserialize_bool_ci"
    )]
    pub is_companion: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_ci")]
    pub beta: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReportDeployBody {
    #[serde(rename = "deploymentKey", alias = "deployment_key")]
    pub deployment_key: String,
    #[serde(rename = "appVersion", alias = "app_version")]
    pub app_version: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub status: Option<DeployStatus>,
    #[serde(rename = "clientUniqueId", alias = "client_unique_id", default)]
    pub client_unique_id: Option<String>,
    #[serde(rename = "previousDeploymentKey", alias = "previous_deployment_key", default)]
    pub previous_deployment_key: Option<String>,
    #[serde(
        rename = "previousLabelOrAppVersion",
        alias = "previous_label_or_app_version",
        default
    )]
    pub previous_label_or_app_version: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub enum DeployStatus {
    DeploymentSucceeded,
    DeploymentFailed,
}

#[derive(Debug, Deserialize)]
pub struct ReportDownloadBody {
    #[serde(rename = "deploymentKey", alias = "deployment_key")]
    pub deployment_key: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct ReportAck {
    pub status: &'static str,
}

fn ack() -> Json<ReportAck> {
    Json(ReportAck { status: "ok" })
}

struct MicrocacheDiffFetcher<'a> {
    state: &'a AppState,
    deployment_key: &'a str,
}

#[async_trait::async_trait]
impl<'a> DiffMapFetcher for MicrocacheDiffFetcher<'a> {
    async fn fetch(&self, target_package_hash: &str) -> Result<Option<DiffMap>, AcquisitionError> {
        let key = format!("{}:{}", self.deployment_key, target_package_hash);
        if let Some(map) = self.state.diff_map_microcache.get(&key) {
            return Ok(Some(map));
        }

        match self
            .state
            .diff_map_store
            .get_diff_map(self.deployment_key, target_package_hash)
            .await?
        {
            Some(map) => {
                self.state.diff_map_microcache.set(key, map.clone());
                Ok(Some(map))
            }
            None => match self
                .state
                .distributed_cache
                .get_diff_map(self.deployment_key, target_package_hash)
                .await
            {
                Ok(Some(map)) => {
                    self.state.diff_map_microcache.set(key, map.clone());
                    Ok(Some(map))
                }
                Ok(None) => Ok(None),
                Err(err) => {
                    tracing::warn!(error = %err, "distributed diff-map cache read failed");
                    Ok(None)
                }
            },
        }
    }
}

async fn run_update_check(
    state: &Arc<AppState>,
    query: UpdateCheckQuery,
    original_url: &str,
) -> Result<crate::selection::UpdateCheckResult, AcquisitionError> {
    if query.deployment_key.trim().is_empty() {
        return Err(AcquisitionError::MalformedRequest(
            "deploymentKey is required".to_string(),
        ));
    }
    if query.app_version.trim().is_empty() {
        return Err(AcquisitionError::MalformedRequest(
            "appVersion is required".to_string(),
        ));
    }

    let normalized_app_version = normalize(&query.app_version);
    let distributed_key = format!("deploymentKey:{}", query.deployment_key);
    let url_key = build_cache_key(original_url, &state.config.cache_schema_version);
    let mem_key = format!("{distributed_key}|{url_key}");

    let diff_fetcher = MicrocacheDiffFetcher {
        state,
        deployment_key: &query.deployment_key,
    };

    let request = UpdateCheckRequest {
        client_unique_id: query.client_unique_id.clone(),
        beta_requested: query.beta.unwrap_or(false),
        request_label: query.label.clone(),
        request_package_hash: query.package_hash.clone(),
        raw_app_version: Some(query.app_version.clone()),
        normalized_app_version,
        request_is_companion: query.is_companion.unwrap_or(false),
    };

    if let Some(cached) = state.response_microcache.get(&mem_key) {
        let body: CacheableResponse = cached.body_as()?;
        return Ok(select_update(&body.releases, &request, &diff_fetcher, state.proxy_base()).await);
    }

    let from_distributed = match state
        .distributed_cache
        .get_response(&distributed_key, &url_key)
        .await
    {
        Ok(hit) => hit,
        Err(err) => {
            tracing::warn!(error = %err, "distributed response cache read failed");
            None
        }
    };

    let (body, came_from_storage) = match from_distributed {
        Some(cached) => (cached.body_as::<CacheableResponse>()?, false),
        None => {
            let history = state
                .history_store
                .get_package_history_from_deployment_key(&query.deployment_key)
                .await?;
            (build_cacheable_response(&history), true)
        }
    };

    let result = select_update(&body.releases, &request, &diff_fetcher, state.proxy_base()).await;

    // Cache write-back (microcache, distributed response cache, diff-map
    // priming) is sequenced strictly after the response is built, per
    // spec §5: the client's latency must not depend on cache write I/O.
    // Fire-and-forget, same as the report handlers' metrics dispatch.
    let write_back_state = Arc::clone(state);
    let deployment_key = query.deployment_key.clone();
    tokio::spawn(async move {
        if let Ok(cached) = CachedResponse::ok(&body) {
            write_back_state.response_microcache.set(mem_key, cached.clone());
            if came_from_storage {
                if let Err(err) = write_back_state
                    .distributed_cache
                    .set_response(&distributed_key, &url_key, &cached)
                    .await
                {
                    tracing::warn!(error = %err, "distributed response cache write failed");
                }
            }
        }

        if came_from_storage {
            for release in &body.releases {
                if !release.diff_package_map.is_empty() {
                    if let Err(err) = write_back_state
                        .distributed_cache
                        .set_diff_map(&deployment_key, &release.package_hash, &release.diff_package_map)
                        .await
                    {
                        tracing::warn!(error = %err, "priming diff-map cache failed");
                    }
                }
            }
        }
    });

    Ok(result)
}

pub async fn update_check_legacy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdateCheckQuery>,
) -> Result<Json<UpdateCheckResponseLegacy>, AcquisitionError> {
    let original_url = format!("/updateCheck?{}", query_to_string(&query));
    let result = run_update_check(&state, query, &original_url).await?;
    Ok(Json(result.into()))
}

pub async fn update_check_new(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdateCheckQuery>,
) -> Result<Json<UpdateCheckResponseNew>, AcquisitionError> {
    let original_url = format!(
        "/v0.1/public/codepush/update_check?{}",
        query_to_string(&query)
    );
    let result = run_update_check(&state, query, &original_url).await?;
    Ok(Json(result.into()))
}

fn query_to_string(query: &UpdateCheckQuery) -> String {
    let mut pairs = vec![
        ("deploymentKey".to_string(), query.deployment_key.clone()),
        ("appVersion".to_string(), query.app_version.clone()),
    ];
    if let Some(v) = &query.package_hash {
        pairs.push(("packageHash".to_string(), v.clone()));
    }
    if let Some(v) = &query.label {
        pairs.push(("label".to_string(), v.clone()));
    }
    if let Some(v) = &query.client_unique_id {
        pairs.push(("clientUniqueId".to_string(), v.clone()));
    }
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn sdk_version_gate(headers: &HeaderMap, breaking_version: &str) -> bool {
    let Some(raw) = headers.get(SDK_VERSION_HEADER).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Ok(sdk_version) = semver::Version::parse(raw) else {
        return false;
    };
    let Ok(breaking) = semver::Version::parse(breaking_version) else {
        return false;
    };
    sdk_version >= breaking
}

async fn report_deploy(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: ReportDeployBody,
) -> Result<Response, AcquisitionError> {
    if body.deployment_key.trim().is_empty() || body.app_version.trim().is_empty() {
        return Err(AcquisitionError::MalformedRequest(
            "deploymentKey and appVersion are required".to_string(),
        ));
    }

    if sdk_version_gate(&headers, &state.config.metrics_breaking_version) {
        let response = ack().into_response();
        tokio::spawn(async move {
            let outcome = match (&body.status, &body.label) {
                (Some(DeployStatus::DeploymentFailed), Some(label)) => {
                    state
                        .metrics
                        .increment_label_status_count(&body.deployment_key, label, MetricStatus::DeploymentFailed)
                        .await
                }
                _ => match &body.label {
                    Some(label) => state.metrics.record_update(&body.deployment_key, label, None).await,
                    None => Ok(()),
                },
            };
            if let Err(err) = outcome {
                tracing::warn!(error = %err, "report-deploy metrics update failed");
            }

            if let Some(client_id) = &body.client_unique_id {
                if let Some(prev_key) = &body.previous_deployment_key {
                    if let Err(err) = state
                        .metrics
                        .remove_deployment_key_client_active_label(prev_key, client_id)
                        .await
                    {
                        tracing::warn!(error = %err, "report-deploy prior active-label cleanup failed");
                    }
                }
            }
        });
        return Ok(response);
    }

    let Some(client_id) = body.client_unique_id.clone() else {
        return Err(AcquisitionError::MalformedRequest(
            "clientUniqueId is required on the legacy report-deploy path".to_string(),
        ));
    };
    let Some(label) = body.label.clone() else {
        return Err(AcquisitionError::MalformedRequest(
            "label is required on the legacy report-deploy path".to_string(),
        ));
    };

    let previous_label = state
        .metrics
        .get_current_active_label(&body.deployment_key, &client_id)
        .await?;

    state
        .metrics
        .update_active_app_for_client(&body.deployment_key, &client_id, &label, previous_label.as_deref())
        .await?;

    Ok(ack().into_response())
}

pub async fn report_deploy_legacy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ReportDeployBody>,
) -> Result<Response, AcquisitionError> {
    report_deploy(state, headers, body).await
}

pub async fn report_deploy_new(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ReportDeployBody>,
) -> Result<Response, AcquisitionError> {
    report_deploy(state, headers, body).await
}

async fn report_download(
    state: Arc<AppState>,
    body: ReportDownloadBody,
) -> Result<Response, AcquisitionError> {
    if body.deployment_key.trim().is_empty() || body.label.trim().is_empty() {
        return Err(AcquisitionError::MalformedRequest(
            "deploymentKey and label are required".to_string(),
        ));
    }

    let response = ack().into_response();
    tokio::spawn(async move {
        if let Err(err) = state
            .metrics
            .increment_label_status_count(&body.deployment_key, &body.label, MetricStatus::Downloaded)
            .await
        {
            tracing::warn!(error = %err, "report-download metrics update failed");
        }
    });
    Ok(response)
}

pub async fn report_download_legacy(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReportDownloadBody>,
) -> Result<Response, AcquisitionError> {
    report_download(state, body).await
}

pub async fn report_download_new(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReportDownloadBody>,
) -> Result<Response, AcquisitionError> {
    report_download(state, body).await
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    if state.health_check().await {
        (StatusCode::OK, "Healthy").into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Unhealthy").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_version_gate_routes_new_path_on_or_above_breaking_version() {
        let mut headers = HeaderMap::new();
        headers.insert(SDK_VERSION_HEADER, "1.5.2-beta".parse().unwrap());
        assert!(sdk_version_gate(&headers, "1.5.2-beta"));

        headers.insert(SDK_VERSION_HEADER, "1.4.0".parse().unwrap());
        assert!(!sdk_version_gate(&headers, "1.5.2-beta"));
    }

    #[test]
    fn sdk_version_gate_routes_legacy_on_missing_or_invalid_header() {
        let headers = HeaderMap::new();
        assert!(!sdk_version_gate(&headers, "1.5.2-beta"));

        let mut headers = HeaderMap::new();
        headers.insert(SDK_VERSION_HEADER, "not-a-version".parse().unwrap());
        assert!(!sdk_version_gate(&headers, "1.5.2-beta"));
    }
}
