//! Optional fan-out of committed notifications to an HTTP endpoint.
//!
//! Delivery never affects the operation that produced the notification:
//! failures are logged and dropped.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Notification;

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body POSTed for each notification.
#[derive(Debug, Clone, Serialize)]
pub struct RelayPayload<'a> {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    pub title: &'a str,
    pub message: &'a str,
    pub created_at: String,
}

impl<'a> From<&'a Notification> for RelayPayload<'a> {
    fn from(n: &'a Notification) -> Self {
        Self {
            notification_id: n.id,
            user_id: n.user_id,
            lead_id: n.lead_id,
            title: &n.title,
            message: &n.message,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Result of a relay delivery attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum RelayResult {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct NotificationRelay {
    url: String,
}

impl NotificationRelay {
    /// Rejects anything that is not an http(s) URL.
    pub fn new(url: &str) -> Result<Self, String> {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid relay URL: {}", e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err("Invalid relay URL: must start with http:// or https://".to_string());
        }
        Ok(Self {
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one notification. Failures are logged, never returned as errors.
    pub fn deliver(&self, notification: &Notification) -> RelayResult {
        match self.send(&RelayPayload::from(notification)) {
            Ok(()) => {
                debug!(notification = %notification.id, "notification relayed");
                RelayResult::Delivered
            }
            Err(e) => {
                warn!(
                    notification = %notification.id,
                    url = %self.url,
                    error = %e,
                    "notification relay failed"
                );
                RelayResult::Failed(e)
            }
        }
    }

    fn send(&self, payload: &RelayPayload) -> Result<(), String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| e.to_string())?;

        let response = client
            .post(&self.url)
            .header("User-Agent", concat!("leadcmd/", env!("CARGO_PKG_VERSION")))
            .json(payload)
            .send()
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("Relay returned HTTP {}", status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeadSource;

    #[test]
    fn test_payload_serialization() {
        let n = Notification::lead_assigned(Uuid::new_v4(), Uuid::new_v4(), LeadSource::Google, "Carol");
        let json = serde_json::to_string(&RelayPayload::from(&n)).unwrap();
        assert!(json.contains(r#""title":"New Lead Assigned""#));
        assert!(json.contains(r#""message":"New lead from Google Ads: Carol""#));
        assert!(json.contains(&n.user_id.to_string()));
    }

    #[test]
    fn test_payload_skips_missing_lead() {
        let n = Notification::new(Uuid::new_v4(), None, "Hi", "there".to_string());
        let json = serde_json::to_string(&RelayPayload::from(&n)).unwrap();
        assert!(!json.contains("lead_id"));
    }

    #[test]
    fn test_invalid_relay_url() {
        assert!(NotificationRelay::new("not-a-valid-url").is_err());
        let err = NotificationRelay::new("ftp://example.com/hook").unwrap_err();
        assert!(err.contains("must start with http"));
        assert!(NotificationRelay::new("https://hooks.example.com/crm").is_ok());
    }

    #[test]
    fn test_unreachable_relay_reports_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let relay = NotificationRelay::new("http://127.0.0.1:9/hook").unwrap();
        let n = Notification::new(Uuid::new_v4(), None, "Hi", "there".to_string());
        assert!(matches!(relay.deliver(&n), RelayResult::Failed(_)));
    }
}
