//! Shared application state, injected into every handler (spec §9
//! "process-wide cache singletons" — modeled as explicit dependencies
//! rather than ambient globals, matching the teacher's `AppState`
//! pattern).

use std::sync::Arc;

use url::Url;

use crate::cache::{CachedResponse, DisabledCache, DistributedCache, RedisDistributedCache};
use crate::config::AppConfig;
use crate::metrics::MetricsStore;
use crate::microcache::Microcache;
use crate::model::DiffMap;
use crate::storage::{DiffMapStore, HistoryStore, InMemoryDiffMapStore, InMemoryHistoryStore};

pub struct AppState {
    pub config: AppConfig,
    pub response_microcache: Microcache<CachedResponse>,
    pub diff_map_microcache: Microcache<DiffMap>,
    pub distributed_cache: Box<dyn DistributedCache>,
    pub metrics: MetricsStore,
    pub history_store: Box<dyn HistoryStore>,
    pub diff_map_store: Box<dyn DiffMapStore>,
}

impl AppState {
    /// Builds production state: a real Redis-backed distributed cache
    /// and metrics store when `REDIS_HOST` is configured, disabled
    /// stand-ins otherwise (spec §5's "absent configuration" state).
    /// The history and diff-package stores are always the in-memory
    /// doubles — the real backends are out of scope (spec §1).
    pub async fn from_config(config: AppConfig) -> Self {
        let (distributed_cache, metrics): (Box<dyn DistributedCache>, MetricsStore) =
            match &config.redis_host {
                Some(host) => {
                    let ops_url = redis_url(host, config.redis_port, config.redis_key.as_deref(), 0);
                    let metrics_url = redis_url(host, config.redis_port, config.redis_key.as_deref(), 1);

                    let ops_client = redis::Client::open(ops_url);
                    let metrics_client = redis::Client::open(metrics_url);

                    let cache: Box<dyn DistributedCache> = match ops_client {
                        Ok(client) => match redis::aio::ConnectionManager::new(client).await {
                            Ok(conn) => Box::new(RedisDistributedCache::with_ttls(
                                conn,
                                config.response_cache_ttl_secs,
                                config.diff_map_cache_ttl_secs,
                            )),
                            Err(err) => {
                                tracing::error!(error = %err, "distributed cache: initial connection failed, disabling");
                                Box::new(DisabledCache)
                            }
                        },
                        Err(err) => {
                            tracing::error!(error = %err, "distributed cache: invalid Redis URL, disabling");
                            Box::new(DisabledCache)
                        }
                    };

                    let metrics = MetricsStore::new(metrics_client.ok());
                    (cache, metrics)
                }
                None => (Box::new(DisabledCache), MetricsStore::disabled()),
            };

        Self {
            response_microcache: Microcache::new(config.updatecheck_mem_ttl_ms),
            diff_map_microcache: Microcache::new(config.diffpackage_mem_ttl_ms),
            distributed_cache,
            metrics,
            history_store: Box::new(InMemoryHistoryStore::new()),
            diff_map_store: Box::new(InMemoryDiffMapStore::new()),
            config,
        }
    }

    pub fn proxy_base(&self) -> Option<&Url> {
        self.config.update_check_proxy_url.as_ref()
    }

    /// Best-effort liveness probe for `/health`: confirms the storage
    /// collaborator answers and the distributed cache (if configured)
    /// does not error on a read.
    pub async fn health_check(&self) -> bool {
        if self
            .history_store
            .get_package_history_from_deployment_key("__health__")
            .await
            .is_err()
        {
            return false;
        }
        self.distributed_cache
            .get_response("__health__", "__health__")
            .await
            .is_ok()
    }
}

fn redis_url(host: &str, port: u16, password: Option<&str>, db: u8) -> String {
    match password {
        Some(password) => format!("rediss://:{password}@{host}:{port}/{db}"),
        None => format!("rediss://{host}:{port}/{db}"),
    }
}

pub type SharedState = Arc<AppState>;
