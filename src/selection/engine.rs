//! Update-selection engine (spec §4.3).
//!
//! Walks a release history newest-first and produces exactly one
//! [`UpdateCheckResult`], honoring rollout ramp-up, mandatory-flag
//! forwarding over skipped releases, and binary-diff substitution.

use async_trait::async_trait;
use url::Url;

use crate::error::AcquisitionError;
use crate::model::{DiffMap, Release};
use crate::rollout::{effective_rollout, is_selected_for_rollout, is_unfinished_rollout, RolloutRamp};

use super::proxy::rewrite_download_url;
use super::semver_range::satisfies;

/// The parsed, normalized fields of one update-check request.
#[derive(Debug, Clone, Default)]
pub struct UpdateCheckRequest {
    pub client_unique_id: Option<String>,
    pub beta_requested: bool,
    pub request_label: Option<String>,
    pub request_package_hash: Option<String>,
    pub raw_app_version: Option<String>,
    pub normalized_app_version: String,
    pub request_is_companion: bool,
}

/// The engine's neutral result shape; wire-shape conversion happens one
/// layer up in `api::responses`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateCheckResult {
    pub is_available: bool,
    pub is_mandatory: bool,
    pub app_version: String,
    pub target_binary_range: String,
    pub package_hash: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub download_url: Option<String>,
    pub package_size: Option<u64>,
    pub update_app_version: bool,
}

/// Resolves the diff map for a release's `packageHash`, consulting
/// whatever cache tiers the caller wants in front of the real store.
/// Fetch failures are the caller's concern to log; this engine treats
/// `Err` the same as `Ok(None)` (full-bundle URL stands).
#[async_trait]
pub trait DiffMapFetcher: Send + Sync {
    async fn fetch(&self, target_package_hash: &str) -> Result<Option<DiffMap>, AcquisitionError>;
}

fn is_current(release: &Release, req: &UpdateCheckRequest) -> bool {
    match &req.request_label {
        Some(label) if !label.is_empty() => release.label == *label,
        _ => match &req.request_package_hash {
            Some(hash) if !hash.is_empty() => release.package_hash == *hash,
            _ => false,
        },
    }
}

fn no_update_response(req: &UpdateCheckRequest) -> UpdateCheckResult {
    let app_version = req
        .raw_app_version
        .clone()
        .unwrap_or_else(|| req.normalized_app_version.clone());
    UpdateCheckResult {
        is_available: false,
        is_mandatory: false,
        target_binary_range: app_version.clone(),
        app_version,
        update_app_version: false,
        ..Default::default()
    }
}

fn create_from_release(release: &Release) -> UpdateCheckResult {
    UpdateCheckResult {
        is_available: true,
        is_mandatory: release.is_mandatory,
        app_version: String::new(),
        target_binary_range: String::new(),
        package_hash: Some(release.package_hash.clone()),
        label: Some(release.label.clone()),
        description: release.description.clone(),
        download_url: Some(release.blob_url.clone()),
        package_size: Some(release.size),
        update_app_version: false,
    }
}

/// Run the engine over `history` (oldest-first) and `req`, resolving
/// diff payloads through `diff_fetcher` and rewriting the download URL
/// through `proxy_base` if configured.
pub async fn select_update(
    history: &[Release],
    req: &UpdateCheckRequest,
    diff_fetcher: &dyn DiffMapFetcher,
    proxy_base: Option<&Url>,
) -> UpdateCheckResult {
    let mut selected_update: Option<UpdateCheckResult> = None;
    let mut selected_release: Option<&Release> = None;
    let mut force_mandatory = false;
    let mut pending_mandatory = false;

    for release in history.iter().rev() {
        let current = is_current(release, req);

        if current && release.is_disabled {
            // A disabled current release is as if the client were on an
            // unknown version; keep walking rather than short-circuit.
            continue;
        }

        if current {
            return match selected_update.take() {
                Some(selected) => {
                    finalize(
                        selected,
                        selected_release.expect("selected_release set alongside selected_update"),
                        force_mandatory,
                        req,
                        diff_fetcher,
                        proxy_base,
                    )
                    .await
                }
                None => no_update_response(req),
            };
        }

        if release.is_disabled {
            continue;
        }

        let applies = req.request_is_companion
            || (!req.normalized_app_version.is_empty()
                && satisfies(&req.normalized_app_version, &release.app_version));
        if !applies {
            continue;
        }

        if selected_update.is_some() {
            if release.is_mandatory {
                force_mandatory = true;
            }
            continue;
        }

        let ramp = RolloutRamp {
            rollout: release.rollout,
            hold_duration_minutes: release.rollout_hold_duration_minutes,
            ramp_duration_minutes: release.rollout_ramp_duration_minutes,
            upload_time: release.rollout_upload_time,
        };
        let tag = if !release.label.is_empty() {
            release.label.as_str()
        } else {
            release.package_hash.as_str()
        };

        let select_this = if !is_unfinished_rollout(release.rollout) {
            true
        } else {
            req.beta_requested
                || is_selected_for_rollout(
                    req.client_unique_id.as_deref().unwrap_or(""),
                    effective_rollout(&ramp, chrono::Utc::now()),
                    tag,
                )
        };

        if select_this {
            selected_update = Some(create_from_release(release));
            selected_release = Some(release);
            force_mandatory = pending_mandatory || release.is_mandatory;
        } else if release.is_mandatory {
            pending_mandatory = true;
        }
    }

    match selected_update {
        Some(selected) => {
            finalize(
                selected,
                selected_release.expect("selected_release set alongside selected_update"),
                force_mandatory,
                req,
                diff_fetcher,
                proxy_base,
            )
            .await
        }
        None => no_update_response(req),
    }
}

async fn finalize(
    mut result: UpdateCheckResult,
    selected_release: &Release,
    force_mandatory: bool,
    req: &UpdateCheckRequest,
    diff_fetcher: &dyn DiffMapFetcher,
    proxy_base: Option<&Url>,
) -> UpdateCheckResult {
    if let Some(request_hash) = req.request_package_hash.as_deref().filter(|h| !h.is_empty()) {
        match diff_fetcher.fetch(&selected_release.package_hash).await {
            Ok(Some(diff_map)) => {
                if let Some(entry) = diff_map.get(request_hash) {
                    result.download_url = Some(entry.url.clone());
                    result.package_size = Some(entry.size);
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "diff map fetch failed, serving full bundle");
            }
        }
    }

    if force_mandatory {
        result.is_mandatory = true;
    }

    result.target_binary_range = selected_release.app_version.clone();
    result.app_version = req
        .raw_app_version
        .clone()
        .unwrap_or_else(|| req.normalized_app_version.clone());

    if let Some(url) = &result.download_url {
        result.download_url = Some(rewrite_download_url(url, proxy_base));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct NullDiffFetcher;

    #[async_trait]
    impl DiffMapFetcher for NullDiffFetcher {
        async fn fetch(&self, _target_package_hash: &str) -> Result<Option<DiffMap>, AcquisitionError> {
            Ok(None)
        }
    }

    struct MapDiffFetcher(HashMap<String, DiffMap>);

    #[async_trait]
    impl DiffMapFetcher for MapDiffFetcher {
        async fn fetch(&self, target_package_hash: &str) -> Result<Option<DiffMap>, AcquisitionError> {
            Ok(self.0.get(target_package_hash).cloned())
        }
    }

    fn release(label: &str, hash: &str, mandatory: bool) -> Release {
        Release {
            label: label.to_string(),
            app_version: "1.0.0".to_string(),
            package_hash: hash.to_string(),
            blob_url: format!("https://blobs.example.com/{hash}"),
            size: 1000,
            is_mandatory: mandatory,
            is_disabled: false,
            description: None,
            rollout: None,
            rollout_hold_duration_minutes: None,
            rollout_ramp_duration_minutes: None,
            rollout_upload_time: None,
            diff_package_map: DiffMap::new(),
        }
    }

    fn req(client_id: &str) -> UpdateCheckRequest {
        UpdateCheckRequest {
            client_unique_id: Some(client_id.to_string()),
            beta_requested: false,
            request_label: None,
            request_package_hash: None,
            raw_app_version: Some("1.0.0".to_string()),
            normalized_app_version: "1.0.0".to_string(),
            request_is_companion: false,
        }
    }

    #[tokio::test]
    async fn empty_history_returns_no_update() {
        let result = select_update(&[], &req("c1"), &NullDiffFetcher, None).await;
        assert!(!result.is_available);
        assert_eq!(result.app_version, "1.0.0");
        assert_eq!(result.target_binary_range, "1.0.0");
    }

    #[tokio::test]
    async fn single_fully_rolled_out_release_is_offered() {
        let history = vec![release("v1", "H1", false)];
        let result = select_update(&history, &req("c1"), &NullDiffFetcher, None).await;
        assert!(result.is_available);
        assert_eq!(result.label.as_deref(), Some("v1"));
        assert_eq!(result.package_hash.as_deref(), Some("H1"));
        assert_eq!(
            result.download_url.as_deref(),
            Some("https://blobs.example.com/H1")
        );
    }

    #[tokio::test]
    async fn client_already_on_latest_gets_no_update() {
        let history = vec![release("v1", "H1", false)];
        let mut request = req("c1");
        request.request_package_hash = Some("H1".to_string());
        let result = select_update(&history, &request, &NullDiffFetcher, None).await;
        assert!(!result.is_available);
    }

    #[tokio::test]
    async fn mandatory_newer_applicable_release_escalates_mandatory() {
        let mut v1 = release("v1", "H1", false);
        v1.app_version = "1.0.0".to_string();
        let mut v2 = release("v2", "H2", true);
        v2.app_version = "1.0.0".to_string();
        let mut v3 = release("v3", "H3", false);
        v3.app_version = "1.0.0".to_string();
        v2.rollout = Some(50);

        let history = vec![v1, v2, v3];

        // Client is far outside v2's rollout cohort for every seed we try
        // below; we simply assert the invariant holds regardless of seed
        // by scanning a handful of client ids and picking one not in the
        // cohort (deterministic hash, no flakiness).
        let mut chosen = None;
        for i in 0..200 {
            let id = format!("client-{i}");
            if !is_selected_for_rollout(&id, 50.0, "v2") {
                chosen = Some(id);
                break;
            }
        }
        let client_id = chosen.expect("some client id must fall outside a 50% cohort");

        let mut request = req(&client_id);
        request.request_package_hash = Some("H1".to_string());

        let result = select_update(&history, &request, &NullDiffFetcher, None).await;
        assert!(result.is_available);
        assert_eq!(result.label.as_deref(), Some("v3"));
        assert!(result.is_mandatory, "mandatory v2 should force v3 mandatory");
    }

    #[tokio::test]
    async fn diff_entry_replaces_url_and_size_when_present() {
        let history = vec![release("v1", "H1", false)];
        let mut request = req("c1");
        request.request_package_hash = Some("H0".to_string());

        let mut diff_map = DiffMap::new();
        diff_map.insert(
            "H0".to_string(),
            crate::model::DiffEntry {
                size: 42,
                url: "https://diffs.example.com/H0-H1".to_string(),
            },
        );
        let mut diffs = HashMap::new();
        diffs.insert("H1".to_string(), diff_map);

        let result = select_update(&history, &request, &MapDiffFetcher(diffs), None).await;
        assert!(result.is_available);
        assert_eq!(result.package_size, Some(42));
        assert_eq!(
            result.download_url.as_deref(),
            Some("https://diffs.example.com/H0-H1")
        );
    }

    #[tokio::test]
    async fn disabled_current_release_continues_walk() {
        let mut v1 = release("v1", "H1", false);
        v1.is_disabled = true;
        let v2 = release("v2", "H2", false);
        let history = vec![v1, v2];

        let mut request = req("c1");
        request.request_package_hash = Some("H1".to_string());

        let result = select_update(&history, &request, &NullDiffFetcher, None).await;
        assert!(result.is_available);
        assert_eq!(result.label.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn companion_client_ignores_app_version_range() {
        let mut v1 = release("v1", "H1", false);
        v1.app_version = "3.0.0".to_string();
        let history = vec![v1];

        let mut request = req("c1");
        request.request_is_companion = true;
        request.normalized_app_version = String::new();

        let result = select_update(&history, &request, &NullDiffFetcher, None).await;
        assert!(result.is_available);
    }
}
