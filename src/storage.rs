//! Storage collaborators (spec §6): the release-history backend and the
//! diff-package archive backend are out of scope (owned by the
//! management REST surface and the blob-storage upload path
//! respectively). This module defines the traits the acquisition path
//! depends on and in-memory test doubles standing in for the real
//! implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::AcquisitionError;
use crate::model::{DiffMap, ReleaseHistory};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn get_package_history_from_deployment_key(
        &self,
        deployment_key: &str,
    ) -> Result<ReleaseHistory, AcquisitionError>;
}

#[async_trait]
pub trait DiffMapStore: Send + Sync {
    async fn get_diff_map(
        &self,
        deployment_key: &str,
        package_hash: &str,
    ) -> Result<Option<DiffMap>, AcquisitionError>;
}

/// Test/dev double for [`HistoryStore`]; a fixed map from deployment key
/// to its release history.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    histories: RwLock<HashMap<String, ReleaseHistory>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(deployment_key: impl Into<String>, history: ReleaseHistory) -> Self {
        let store = Self::new();
        store.set(deployment_key, history);
        store
    }

    pub fn set(&self, deployment_key: impl Into<String>, history: ReleaseHistory) {
        self.histories
            .write()
            .expect("history store lock poisoned")
            .insert(deployment_key.into(), history);
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get_package_history_from_deployment_key(
        &self,
        deployment_key: &str,
    ) -> Result<ReleaseHistory, AcquisitionError> {
        Ok(self
            .histories
            .read()
            .expect("history store lock poisoned")
            .get(deployment_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Test/dev double for [`DiffMapStore`]; keyed the same way as the real
/// diff-package archive backend would be.
#[derive(Default)]
pub struct InMemoryDiffMapStore {
    maps: RwLock<HashMap<(String, String), DiffMap>>,
}

impl InMemoryDiffMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, deployment_key: impl Into<String>, package_hash: impl Into<String>, map: DiffMap) {
        self.maps
            .write()
            .expect("diff map store lock poisoned")
            .insert((deployment_key.into(), package_hash.into()), map);
    }
}

#[async_trait]
impl DiffMapStore for InMemoryDiffMapStore {
    async fn get_diff_map(
        &self,
        deployment_key: &str,
        package_hash: &str,
    ) -> Result<Option<DiffMap>, AcquisitionError> {
        Ok(self
            .maps
            .read()
            .expect("diff map store lock poisoned")
            .get(&(deployment_key.to_string(), package_hash.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_deployment_key_returns_empty_history() {
        let store = InMemoryHistoryStore::new();
        let history = store
            .get_package_history_from_deployment_key("Nonexistent")
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn diff_map_store_returns_none_on_miss() {
        let store = InMemoryDiffMapStore::new();
        let result = store.get_diff_map("Production", "H1").await.unwrap();
        assert!(result.is_none());
    }
}
