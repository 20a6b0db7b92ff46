//! In-memory status store.

use super::{keys, StatusSink};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static GLOBAL_STATUS_STORE: LazyLock<Arc<StatusStore>> = LazyLock::new(|| Arc::new(StatusStore::new()));

/// Returns the process-wide status store, creating it on first use.
///
/// The store lives until the process exits.
#[must_use]
pub fn global_status_store() -> Arc<StatusStore> {
    Arc::clone(&GLOBAL_STATUS_STORE)
}

/// Key-value status map with copy-on-read access.
#[derive(Debug)]
pub struct StatusStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    /// Creates a store holding the initial, not-yet-deployed status.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(keys::ANSIBLE_STAGE.to_string(), json!("WAITING_FOR_DEPLOYMENT_START"));
        entries.insert(keys::CLUSTER_STATUS.to_string(), json!("NOT_DEPLOYED"));
        entries.insert(keys::ALERTS.to_string(), json!([]));
        entries.insert(keys::DIAGNOSTIC_LOGS.to_string(), json!(""));
        entries.insert(keys::ACTIVE_NODES.to_string(), json!([]));
        entries.insert(keys::LAST_UPDATE.to_string(), json!(crate::utils::now_millis()));
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns a copy of the whole map.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.read().clone()
    }

    /// Returns a copy of the whole map as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.snapshot().into_iter().collect::<Map<_, _>>())
    }

    /// Returns a copy of one value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Returns the alerts recorded so far.
    #[must_use]
    pub fn alerts(&self) -> Vec<String> {
        match self.get(keys::ALERTS) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Sets a value and refreshes `lastUpdate`.
    pub fn set(&self, key: &str, value: Value) {
        debug!(key, %value, "Status store updated");
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value);
        entries.insert(keys::LAST_UPDATE.to_string(), json!(crate::utils::now_millis()));
    }

    /// Sets a textual value; text shaped like a JSON object is stored parsed.
    pub fn set_text(&self, key: &str, text: &str) {
        self.set(key, text_value(text));
    }

    /// Appends an alert to the alert list.
    pub fn append_alert(&self, alert: &str) {
        let mut entries = self.entries.write();
        let alerts = entries
            .entry(keys::ALERTS.to_string())
            .or_insert_with(|| json!([]));
        match alerts {
            Value::Array(items) => items.push(json!(alert)),
            other => *other = json!([alert]),
        }
        entries.insert(keys::LAST_UPDATE.to_string(), json!(crate::utils::now_millis()));
    }
}

fn text_value(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    Value::String(text.to_string())
}

#[async_trait]
impl StatusSink for StatusStore {
    async fn update(&self, key: &str, value: Value) {
        match value {
            Value::String(text) => self.set_text(key, &text),
            other => self.set(key, other),
        }
    }

    async fn push_alert(&self, alert: &str) {
        self.append_alert(alert);
    }
}
