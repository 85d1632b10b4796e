//! Cache-key builder (spec §4.7).
//!
//! Produces a canonical `pathname?query` string that is a pure function
//! of the request's cache-relevant inputs: client identity, rollout
//! input, and diff-selection fields are dropped; `appVersion` is run
//! through the version normalizer so that `"2"` and `"2.0.0"` collapse
//! to the same key.

use url::Url;

use crate::version::normalize;

const DROPPED_FIELDS: &[&str] = &[
    "clientUniqueId",
    "client_unique_id",
    "beta",
    "packageHash",
    "package_hash",
    "label",
];

/// `original_url` may be a full URL or a bare `path?query`; either way
/// only the path and query matter. `cache_schema` is appended as
/// `__cacheSchema` so bumping it globally invalidates every cached
/// response-cache entry.
pub fn build_cache_key(original_url: &str, cache_schema: &str) -> String {
    let parseable = if original_url.starts_with("http://") || original_url.starts_with("https://") {
        original_url.to_string()
    } else {
        format!("http://placeholder.invalid{}", with_leading_slash(original_url))
    };

    let Ok(parsed) = Url::parse(&parseable) else {
        return original_url.to_string();
    };

    let mut fields: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !DROPPED_FIELDS.contains(&k.as_ref()))
        .map(|(k, v)| {
            if k == "appVersion" || k == "app_version" {
                (k.into_owned(), normalize(&v))
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields.push(("__cacheSchema".to_string(), cache_schema.to_string()));

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .finish();

    format!("{}?{}", parsed.path(), query)
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_client_identity_and_diff_selection_fields() {
        let a = build_cache_key(
            "/updateCheck?deploymentKey=D1&appVersion=1.0.0&clientUniqueId=c1&beta=true",
            "v2",
        );
        let b = build_cache_key(
            "/updateCheck?deploymentKey=D1&appVersion=1.0.0&clientUniqueId=c2&beta=false",
            "v2",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn normalizes_app_version_before_keying() {
        let a = build_cache_key("/updateCheck?deploymentKey=D1&appVersion=2", "v2");
        let b = build_cache_key("/updateCheck?deploymentKey=D1&appVersion=2.0.0", "v2");
        assert_eq!(a, b);
    }

    #[test]
    fn different_cache_schema_yields_different_key() {
        let a = build_cache_key("/updateCheck?deploymentKey=D1&appVersion=1.0.0", "v1");
        let b = build_cache_key("/updateCheck?deploymentKey=D1&appVersion=1.0.0", "v2");
        assert_ne!(a, b);
    }

    #[test]
    fn snake_case_and_camel_case_diff_fields_both_dropped() {
        let a = build_cache_key(
            "/v0.1/public/codepush/update_check?deployment_key=D1&app_version=1.0.0&package_hash=H1&label=v3",
            "v2",
        );
        let b = build_cache_key(
            "/v0.1/public/codepush/update_check?deployment_key=D1&app_version=1.0.0",
            "v2",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn key_includes_original_path() {
        let key = build_cache_key("/updateCheck?deploymentKey=D1&appVersion=1.0.0", "v2");
        assert!(key.starts_with("/updateCheck?"));
    }
}
