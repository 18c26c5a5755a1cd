//! Action payloads and the transport seam.
//!
//! The engine drives two action kinds: python scripts POSTed to an external
//! executor with the triggering attestation injected as a variable, and
//! plain webhooks. HTTP sits behind [`ActionTransport`] so tests can swap
//! in a recorder.

use ats_core::attestation::Attestation;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("action returned status {status}: {body}")]
    ActionFailed { status: u16, body: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Response surfaced by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_2xx(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP seam between the engine and the outside world.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<TransportResponse, WatchError>;
}

/// reqwest-backed transport used in production.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<TransportResponse, WatchError> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WatchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WatchError::Transport(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

/// Build the python executor payload: the user script prefixed with an
/// injection header that deserialises the attestation into an
/// `attestation` variable.
pub fn python_payload(
    attestation: &Attestation,
    user_code: &str,
) -> Result<serde_json::Value, WatchError> {
    let attestation_json = serde_json::to_string(attestation)?;
    let escaped = attestation_json.replace('\\', "\\\\").replace('"', "\\\"");
    let code = format!(
        "import json\n_attestation_json = \"{}\"\nattestation = json.loads(_attestation_json)\n\n{}",
        escaped, user_code
    );
    Ok(json!({ "code": code }))
}

/// Build the webhook trigger payload.
pub fn webhook_payload(
    watcher_id: &str,
    attestation: &Attestation,
    fired_at: chrono::DateTime<chrono::Utc>,
) -> Result<serde_json::Value, WatchError> {
    Ok(json!({
        "watcher_id": watcher_id,
        "attestation": attestation,
        "fired_at": fired_at.to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_core::AttestationBuilder;
    use chrono::TimeZone;

    fn sample() -> Attestation {
        AttestationBuilder::new()
            .id("AS-1")
            .subject("ALICE")
            .predicate("login")
            .context("portal")
            .actor("auth")
            .timestamp(1704067200000)
            .source("api")
            .build()
    }

    #[test]
    fn python_payload_injects_attestation() {
        let payload = python_payload(&sample(), "print(attestation['id'])").unwrap();
        let code = payload["code"].as_str().unwrap();

        assert!(code.starts_with("import json\n_attestation_json = \""));
        assert!(code.contains("attestation = json.loads(_attestation_json)"));
        assert!(code.ends_with("print(attestation['id'])"));
        // the embedded JSON is escaped into a python string literal
        assert!(code.contains("\\\"id\\\""));
    }

    #[test]
    fn webhook_payload_shape() {
        let fired_at = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let payload = webhook_payload("w-1", &sample(), fired_at).unwrap();

        assert_eq!(payload["watcher_id"], "w-1");
        assert_eq!(payload["attestation"]["id"], "AS-1");
        assert_eq!(payload["fired_at"], "2024-01-01T09:30:00+00:00");
    }

    #[test]
    fn transport_response_status_classes() {
        assert!(TransportResponse {
            status: 204,
            body: String::new()
        }
        .is_2xx());
        assert!(!TransportResponse {
            status: 500,
            body: "boom".into()
        }
        .is_2xx());
    }
}
