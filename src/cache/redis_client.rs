use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::AcquisitionError;
use crate::model::DiffMap;

use super::{CachedResponse, DistributedCache};

pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: i64 = 3_600;
pub const DEFAULT_DIFF_MAP_CACHE_TTL_SECS: i64 = 300;

/// Redis-backed implementation of [`DistributedCache`], grounded on the
/// teacher's L3 Redis tier (`database::cache::CacheManager`): same
/// `ConnectionManager` handle, same "log and degrade" error policy, same
/// hash-field layout, narrowed to exactly the two shapes this service
/// needs.
pub struct RedisDistributedCache {
    conn: ConnectionManager,
    response_cache_ttl_secs: i64,
    diff_map_cache_ttl_secs: i64,
}

impl RedisDistributedCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_ttls(conn, DEFAULT_RESPONSE_CACHE_TTL_SECS, DEFAULT_DIFF_MAP_CACHE_TTL_SECS)
    }

    pub fn with_ttls(conn: ConnectionManager, response_cache_ttl_secs: i64, diff_map_cache_ttl_secs: i64) -> Self {
        Self {
            conn,
            response_cache_ttl_secs,
            diff_map_cache_ttl_secs,
        }
    }

    fn diff_map_key(deployment_key: &str) -> String {
        format!("diffMap:{deployment_key}")
    }
}

#[async_trait]
impl DistributedCache for RedisDistributedCache {
    async fn get_response(
        &self,
        distributed_key: &str,
        url_key: &str,
    ) -> Result<Option<CachedResponse>, AcquisitionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .hget(distributed_key, url_key)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AcquisitionError::Cache(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set_response(
        &self,
        distributed_key: &str,
        url_key: &str,
        response: &CachedResponse,
    ) -> Result<(), AcquisitionError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(response).map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        let _: () = conn
            .hset(distributed_key, url_key, json)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        // Only the first write establishes the TTL; NX leaves an
        // already-ttl'd key untouched so later writes don't extend it.
        let _: () = redis::cmd("EXPIRE")
            .arg(distributed_key)
            .arg(self.response_cache_ttl_secs)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        Ok(())
    }

    async fn invalidate(&self, distributed_key: &str) -> Result<(), AcquisitionError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(distributed_key)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;
        Ok(())
    }

    async fn get_diff_map(
        &self,
        deployment_key: &str,
        package_hash: &str,
    ) -> Result<Option<DiffMap>, AcquisitionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .hget(Self::diff_map_key(deployment_key), package_hash)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AcquisitionError::Cache(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set_diff_map(
        &self,
        deployment_key: &str,
        package_hash: &str,
        diff_map: &DiffMap,
    ) -> Result<(), AcquisitionError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(diff_map).map_err(|e| AcquisitionError::Cache(e.to_string()))?;
        let _: () = conn
            .hset(Self::diff_map_key(deployment_key), package_hash, json)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        // Medium TTL per spec §3 ("Diff-map entries expire after a medium
        // TTL"); unlike the response cache this refreshes on every write
        // since entries are repopulated per release commit, not per request.
        let _: () = conn
            .expire(Self::diff_map_key(deployment_key), self.diff_map_cache_ttl_secs)
            .await
            .map_err(|e| AcquisitionError::Cache(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_map_key_is_namespaced_per_deployment() {
        assert_eq!(
            RedisDistributedCache::diff_map_key("Production"),
            "diffMap:Production"
        );
    }
}
