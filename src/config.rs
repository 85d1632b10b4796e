//! Runtime configuration (spec §6, SPEC_FULL.md §2): all tunables are
//! read once at startup from the environment, with `dotenvy` loading a
//! local `.env` file first if present — the same bootstrap convention
//! the teacher uses in its own `main.rs`.

use std::env;

use url::Url;

const DEFAULT_UPDATECHECK_MEM_TTL_MS: u64 = 30_000;
const DEFAULT_DIFFPACKAGE_MEM_TTL_MS: u64 = 300_000;
const DEFAULT_CACHE_SCHEMA_VERSION: &str = "v2";
const DEFAULT_METRICS_BREAKING_VERSION: &str = "1.5.2-beta";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RESPONSE_CACHE_TTL_SECS: i64 = 3_600;
const DEFAULT_DIFF_MAP_CACHE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_host: Option<String>,
    pub redis_port: u16,
    pub redis_key: Option<String>,
    pub update_check_proxy_url: Option<Url>,
    pub updatecheck_mem_ttl_ms: u64,
    pub diffpackage_mem_ttl_ms: u64,
    pub cache_schema_version: String,
    pub metrics_breaking_version: String,
    pub port: u16,
    pub response_cache_ttl_secs: i64,
    pub diff_map_cache_ttl_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            redis_host: non_empty(env::var("REDIS_HOST").ok()),
            redis_port: env::var("REDIS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6379),
            redis_key: non_empty(env::var("REDIS_KEY").ok()),
            update_check_proxy_url: env::var("UPDATE_CHECK_PROXY_URL")
                .ok()
                .and_then(|v| Url::parse(&v).ok()),
            updatecheck_mem_ttl_ms: env::var("UPDATECHECK_MEM_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_UPDATECHECK_MEM_TTL_MS),
            diffpackage_mem_ttl_ms: env::var("DIFFPACKAGE_MEM_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DIFFPACKAGE_MEM_TTL_MS),
            cache_schema_version: env::var("CACHE_SCHEMA_VERSION")
                .unwrap_or_else(|_| DEFAULT_CACHE_SCHEMA_VERSION.to_string()),
            metrics_breaking_version: env::var("METRICS_BREAKING_VERSION")
                .unwrap_or_else(|_| DEFAULT_METRICS_BREAKING_VERSION.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            response_cache_ttl_secs: env::var("RESPONSE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RESPONSE_CACHE_TTL_SECS),
            diff_map_cache_ttl_secs: env::var("DIFFMAP_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DIFF_MAP_CACHE_TTL_SECS),
        }
    }

    /// The distributed cache (and metrics store) are only configured
    /// when a Redis host is present; absent configuration is a valid,
    /// fully-functional "caching disabled" state (spec §5).
    pub fn cache_enabled(&self) -> bool {
        self.redis_host.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_disabled_without_redis_host() {
        let config = AppConfig {
            redis_host: None,
            redis_port: 6379,
            redis_key: None,
            update_check_proxy_url: None,
            updatecheck_mem_ttl_ms: 30_000,
            diffpackage_mem_ttl_ms: 300_000,
            cache_schema_version: "v2".to_string(),
            metrics_breaking_version: "1.5.2-beta".to_string(),
            port: 3000,
            response_cache_ttl_secs: 3_600,
            diff_map_cache_ttl_secs: 300,
        };
        assert!(!config.cache_enabled());
    }
}
