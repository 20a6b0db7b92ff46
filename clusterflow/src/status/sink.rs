//! Status sink trait and simple implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

/// Trait for destinations of orchestration status updates.
///
/// Implementations must not fail loudly: a broken sink is logged and
/// otherwise ignored so it can never stop a deployment.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Sets `key` to `value`.
    async fn update(&self, key: &str, value: Value);

    /// Appends an operator alert to the alert list.
    async fn push_alert(&self, alert: &str);
}

/// A sink that only logs updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStatusSink;

#[async_trait]
impl StatusSink for LoggingStatusSink {
    async fn update(&self, key: &str, value: Value) {
        info!(key, %value, "Status update");
    }

    async fn push_alert(&self, alert: &str) {
        info!(alert, "Status alert");
    }
}

/// A sink that records every call, for tests.
#[derive(Debug, Default)]
pub struct CollectingStatusSink {
    updates: RwLock<Vec<(String, Value)>>,
    alerts: RwLock<Vec<String>>,
}

impl CollectingStatusSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every update in order.
    #[must_use]
    pub fn updates(&self) -> Vec<(String, Value)> {
        self.updates.read().clone()
    }

    /// Returns the values written to one key, in order.
    #[must_use]
    pub fn values_of(&self, key: &str) -> Vec<Value> {
        self.updates
            .read()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Returns the last value written to a key.
    #[must_use]
    pub fn last(&self, key: &str) -> Option<Value> {
        self.values_of(key).pop()
    }

    /// Returns every alert in order.
    #[must_use]
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.read().clone()
    }
}

#[async_trait]
impl StatusSink for CollectingStatusSink {
    async fn update(&self, key: &str, value: Value) {
        self.updates.write().push((key.to_string(), value));
    }

    async fn push_alert(&self, alert: &str) {
        self.alerts.write().push(alert.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingStatusSink;
        sink.update("clusterStatus", json!("DEPLOYING")).await;
        sink.push_alert("ALERT: test").await;
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingStatusSink::new();
        sink.update("ansibleStage", json!("prep")).await;
        sink.update("clusterStatus", json!("DEPLOYING")).await;
        sink.update("ansibleStage", json!("install")).await;
        sink.push_alert("ALERT: boom").await;

        assert_eq!(sink.updates().len(), 3);
        assert_eq!(sink.values_of("ansibleStage"), vec![json!("prep"), json!("install")]);
        assert_eq!(sink.last("clusterStatus"), Some(json!("DEPLOYING")));
        assert_eq!(sink.alerts(), vec!["ALERT: boom".to_string()]);
        assert!(sink.last("missing").is_none());
    }
}
