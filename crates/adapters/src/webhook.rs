// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook notification sink
//!
//! Posts each message as a JSON object with a single configurable text
//! field. The HTTP call is blocking (`ureq`), so it runs on the blocking
//! thread pool.

use async_trait::async_trait;
use drowse_core::{NotificationSink, SinkError};
use serde_json::{Map, Value};
use tracing::debug;

const USER_AGENT: &str = "drowse-autosuspend";

/// Sink delivering to a configured webhook URL
#[derive(Clone)]
pub struct WebhookSink {
    url: String,
    json_key: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, json_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            json_key: json_key.into(),
        }
    }

    fn payload(&self, text: &str) -> Value {
        let mut payload = Map::new();
        payload.insert(self.json_key.clone(), Value::String(text.to_string()));
        Value::Object(payload)
    }

    fn post(&self, text: &str) -> Result<(), SinkError> {
        let payload = self.payload(text);
        ureq::post(self.url.as_str())
            .header("User-Agent", USER_AGENT)
            .send_json(payload)
            .map_err(|e| SinkError::Http(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let sink = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || sink.post(&text))
            .await
            .map_err(|e| SinkError::Failed(e.to_string()))?
    }
}

/// Sink used when no webhook is configured. Drops every message.
#[derive(Clone, Default)]
pub struct NoopSink;

impl NoopSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for NoopSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        debug!(text, "dropping notification (no webhook configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_the_configured_field_name() {
        let sink = WebhookSink::new("https://hooks.example/abc", "text");
        let payload = sink.payload("Server suspended.");
        assert_eq!(
            payload,
            serde_json::json!({ "text": "Server suspended." })
        );
    }

    #[test]
    fn payload_defaults_roundtrip_as_json() {
        let sink = WebhookSink::new("https://hooks.example/abc", "content");
        let encoded = sink.payload("alice joined the game. (3 players online)");
        assert_eq!(
            serde_json::to_string(&encoded).ok().as_deref(),
            Some(r#"{"content":"alice joined the game. (3 players online)"}"#)
        );
    }

    #[tokio::test]
    async fn noop_sink_always_succeeds() {
        let sink = NoopSink::new();
        assert!(sink.deliver("anything").await.is_ok());
    }
}
