//! Status sink that forwards updates to a remote status service.

use super::StatusSink;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const STATUS_PATH: &str = "/api/internal/status";

#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    key: &'a str,
    value: &'a Value,
}

/// POSTs `{key, value}` bodies to `<base_url>/api/internal/status`.
///
/// Alerts are accumulated locally and sent as the whole `alerts` array.
/// Delivery failures are logged and dropped.
#[derive(Debug)]
pub struct HttpStatusSink {
    client: reqwest::Client,
    endpoint: String,
    alerts: Mutex<Vec<String>>,
}

impl HttpStatusSink {
    /// Creates a sink for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{STATUS_PATH}", base_url.trim_end_matches('/')),
            alerts: Mutex::new(Vec::new()),
        })
    }

    /// Full URL updates are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, key: &str, value: &Value) {
        let body = StatusUpdate { key, value };
        let sent = self.client.post(&self.endpoint).json(&body).send().await;
        match sent.and_then(reqwest::Response::error_for_status) {
            Ok(_) => {}
            Err(e) => warn!(key, endpoint = %self.endpoint, error = %e, "Failed to deliver status update"),
        }
    }
}

#[async_trait]
impl StatusSink for HttpStatusSink {
    async fn update(&self, key: &str, value: Value) {
        self.post(key, &value).await;
    }

    async fn push_alert(&self, alert: &str) {
        let alerts = {
            let mut alerts = self.alerts.lock();
            alerts.push(alert.to_string());
            Value::from(alerts.clone())
        };
        self.post(super::keys::ALERTS, &alerts).await;
    }
}
