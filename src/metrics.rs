//! Metrics store (spec §4.6): atomic, best-effort counters over Redis
//! hashes in a namespace isolated from the response cache.
//!
//! Grounded on the teacher's `saas::usage::UsageManager` metering API
//! shape (named operations over a pooled async client, `UsageMetric`-style
//! enum for known counter kinds), translated from Postgres rows to Redis
//! hash-field increments per spec §4.5/§4.6. The one-time "setup promise"
//! gating the metrics connection mirrors the teacher's
//! `OnceCell`-initialized singleton pattern used elsewhere in the stack.

use std::collections::HashMap;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use crate::error::AcquisitionError;

/// The three statuses `incrementLabelStatusCount` recognizes. `Active`
/// is not among them — it is only ever touched directly by
/// `record_update`/`update_active_app_for_client`'s own pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricStatus {
    Downloaded,
    DeploymentSucceeded,
    DeploymentFailed,
}

impl MetricStatus {
    fn as_str(self) -> &'static str {
        match self {
            MetricStatus::Downloaded => "Downloaded",
            MetricStatus::DeploymentSucceeded => "DeploymentSucceeded",
            MetricStatus::DeploymentFailed => "DeploymentFailed",
        }
    }
}

fn labels_key(deployment_key: &str) -> String {
    format!("deploymentKeyLabels:{deployment_key}")
}

fn clients_key(deployment_key: &str) -> String {
    format!("deploymentKeyClients:{deployment_key}")
}

/// Best-effort counters store. Constructed with an optional Redis client
/// bound to the metrics database; if `None` (metrics disabled or
/// unconfigured), every operation is a logged no-op.
pub struct MetricsStore {
    client: Option<redis::Client>,
    conn: OnceCell<Option<ConnectionManager>>,
}

impl MetricsStore {
    pub fn new(client: Option<redis::Client>) -> Self {
        Self {
            client,
            conn: OnceCell::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Every metrics operation chains onto this; concurrent callers
    /// before the first connection resolves all await the same future.
    async fn connection(&self) -> Option<ConnectionManager> {
        self.conn
            .get_or_init(|| async {
                let client = self.client.as_ref()?;
                match ConnectionManager::new(client.clone()).await {
                    Ok(conn) => Some(conn),
                    Err(err) => {
                        tracing::warn!(error = %err, "metrics store: connection setup failed");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    pub async fn increment_label_status_count(
        &self,
        deployment_key: &str,
        label: &str,
        status: MetricStatus,
    ) -> Result<(), AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        let field = format!("{label}:{}", status.as_str());
        let _: i64 = conn
            .hincr(labels_key(deployment_key), field, 1)
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))?;
        Ok(())
    }

    pub async fn record_update(
        &self,
        current_deployment_key: &str,
        current_label: &str,
        previous: Option<(&str, &str)>,
    ) -> Result<(), AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hincr(labels_key(current_deployment_key), format!("{current_label}:Active"), 1)
            .ignore()
            .hincr(
                labels_key(current_deployment_key),
                format!("{current_label}:DeploymentSucceeded"),
                1,
            )
            .ignore();

        if let Some((prev_deployment_key, prev_label)) = previous {
            pipe.hincr(labels_key(prev_deployment_key), format!("{prev_label}:Active"), -1)
                .ignore();
        }

        pipe.query_async(&mut conn)
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))?;
        Ok(())
    }

    pub async fn update_active_app_for_client(
        &self,
        deployment_key: &str,
        client_id: &str,
        to_label: &str,
        from_label: Option<&str>,
    ) -> Result<(), AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(clients_key(deployment_key), client_id, to_label)
            .ignore()
            .hincr(labels_key(deployment_key), format!("{to_label}:Active"), 1)
            .ignore();

        if let Some(from_label) = from_label {
            pipe.hincr(labels_key(deployment_key), format!("{from_label}:Active"), -1)
                .ignore();
        }

        pipe.query_async(&mut conn)
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))?;
        Ok(())
    }

    pub async fn get_current_active_label(
        &self,
        deployment_key: &str,
        client_id: &str,
    ) -> Result<Option<String>, AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(None);
        };
        conn.hget(clients_key(deployment_key), client_id)
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))
    }

    pub async fn remove_deployment_key_client_active_label(
        &self,
        deployment_key: &str,
        client_id: &str,
    ) -> Result<(), AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        let _: i64 = conn
            .hdel(clients_key(deployment_key), client_id)
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))?;
        Ok(())
    }

    pub async fn get_metrics_with_deployment_key(
        &self,
        deployment_key: &str,
    ) -> Result<HashMap<String, i64>, AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(HashMap::new());
        };
        let raw: HashMap<String, String> = conn
            .hgetall(labels_key(deployment_key))
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))?;

        let mut coerced = HashMap::with_capacity(raw.len());
        for (field, value) in raw {
            match value.parse::<i64>() {
                Ok(n) => {
                    coerced.insert(field, n);
                }
                Err(_) => {
                    tracing::warn!(field, value, "metrics store: non-numeric counter value");
                }
            }
        }
        Ok(coerced)
    }

    pub async fn clear_metrics_for_deployment_key(
        &self,
        deployment_key: &str,
    ) -> Result<(), AcquisitionError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        let _: i64 = conn
            .del(vec![labels_key(deployment_key), clients_key(deployment_key)])
            .await
            .map_err(|e| AcquisitionError::Metrics(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_spec_field_suffixes() {
        assert_eq!(MetricStatus::Downloaded.as_str(), "Downloaded");
        assert_eq!(MetricStatus::DeploymentSucceeded.as_str(), "DeploymentSucceeded");
        assert_eq!(MetricStatus::DeploymentFailed.as_str(), "DeploymentFailed");
    }

    #[tokio::test]
    async fn disabled_store_is_a_no_op_on_every_operation() {
        let store = MetricsStore::disabled();
        store
            .increment_label_status_count("Production", "v1", MetricStatus::Downloaded)
            .await
            .unwrap();
        store.record_update("Production", "v1", None).await.unwrap();
        assert_eq!(
            store.get_current_active_label("Production", "c1").await.unwrap(),
            None
        );
        assert!(store
            .get_metrics_with_deployment_key("Production")
            .await
            .unwrap()
            .is_empty());
    }
}
