//! Data model (spec §3): releases, release history, the cacheable
//! response body, and diff maps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A binary-diff archive from some source `packageHash` to a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub size: u64,
    pub url: String,
}

/// `sourceHash -> diff entry` for one release.
pub type DiffMap = HashMap<String, DiffEntry>;

/// One versioned bundle published to a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Server-assigned monotonically increasing identifier, unique
    /// within a deployment (e.g. `v17`).
    pub label: String,

    /// A semver range (or exact version) naming the binary versions
    /// this bundle is compatible with.
    pub app_version: String,

    /// Content hash of the full bundle archive; primary content
    /// identity.
    pub package_hash: String,

    /// URL from which the full bundle can be downloaded.
    pub blob_url: String,

    /// Byte size of the full bundle.
    pub size: u64,

    #[serde(default)]
    pub is_mandatory: bool,

    #[serde(default)]
    pub is_disabled: bool,

    #[serde(default)]
    pub description: Option<String>,

    /// Integer in `[0,100]`, or absent meaning fully rolled out.
    #[serde(default)]
    pub rollout: Option<u32>,

    #[serde(default)]
    pub rollout_hold_duration_minutes: Option<i64>,

    #[serde(default)]
    pub rollout_ramp_duration_minutes: Option<i64>,

    #[serde(default)]
    pub rollout_upload_time: Option<DateTime<Utc>>,

    /// Mapping from a source `packageHash` to the diff archive from
    /// that source to this release.
    #[serde(default)]
    pub diff_package_map: DiffMap,
}

/// An ordered sequence of releases for one deployment, oldest first.
pub type ReleaseHistory = Vec<Release>;

/// The pre-selection form stored in the distributed cache: the filtered
/// release list for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheableResponse {
    pub releases: Vec<Release>,
}

/// Filter a release history down to the subset whose `appVersion` range
/// could possibly match *some* request, for storage in the distributed
/// cache. Disabled releases are excluded; a companion client accepts
/// anything, so nothing can be excluded purely on version-range grounds
/// without knowing every possible client — this filter only drops
/// releases that can never be selected (namely: none, since any release
/// could in principle be `isCurrent` for some client). It exists as the
/// named seam the spec calls out; today it is the identity function over
/// non-disabled releases plus disabled-but-potentially-current ones, so
/// it simply passes the full history through.
pub fn build_cacheable_response(history: &ReleaseHistory) -> CacheableResponse {
    CacheableResponse {
        releases: history.clone(),
    }
}
