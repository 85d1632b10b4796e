//! Wire-format response bodies for the acquisition HTTP surface.
//!
//! The two update-check routes return structurally identical bodies
//! with different key casing (spec §6); separate structs exist instead
//! of a runtime key-transform so the shape each route promises is
//! checked at compile time.

use serde::Serialize;

use crate::selection::UpdateCheckResult;

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCheckResponseLegacy {
    #[serde(rename = "updateInfo")]
    pub update_info: UpdateInfoLegacy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfoLegacy {
    pub is_available: bool,
    pub is_mandatory: bool,
    pub app_version: String,
    pub target_binary_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    // Historically "downloadURL", not the mechanically-converted
    // "downloadUrl" — client SDKs depend on the literal casing.
    #[serde(rename = "downloadURL", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_size: Option<u64>,
    pub update_app_version: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCheckResponseNew {
    pub update_info: UpdateInfoNew,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UpdateInfoNew {
    pub is_available: bool,
    pub is_mandatory: bool,
    pub app_version: String,
    pub target_binary_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_size: Option<u64>,
    pub update_app_version: bool,
}

impl From<UpdateCheckResult> for UpdateInfoLegacy {
    fn from(r: UpdateCheckResult) -> Self {
        Self {
            is_available: r.is_available,
            is_mandatory: r.is_mandatory,
            app_version: r.app_version,
            target_binary_range: r.target_binary_range,
            package_hash: r.package_hash,
            label: r.label,
            description: r.description,
            download_url: r.download_url,
            package_size: r.package_size,
            update_app_version: r.update_app_version,
        }
    }
}

impl From<UpdateCheckResult> for UpdateInfoNew {
    fn from(r: UpdateCheckResult) -> Self {
        Self {
            is_available: r.is_available,
            is_mandatory: r.is_mandatory,
            app_version: r.app_version,
            target_binary_range: r.target_binary_range,
            package_hash: r.package_hash,
            label: r.label,
            description: r.description,
            download_url: r.download_url,
            package_size: r.package_size,
            update_app_version: r.update_app_version,
        }
    }
}

impl From<UpdateCheckResult> for UpdateCheckResponseLegacy {
    fn from(r: UpdateCheckResult) -> Self {
        Self {
            update_info: r.into(),
        }
    }
}

impl From<UpdateCheckResult> for UpdateCheckResponseNew {
    fn from(r: UpdateCheckResult) -> Self {
        Self {
            update_info: r.into(),
        }
    }
}
