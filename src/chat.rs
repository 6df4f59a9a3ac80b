//! Chat assistant webhook relay
//!
//! Forwards a user's chat message to an external automation webhook and
//! normalizes whatever shape the webhook answers with into plain text.
//! Failures never propagate as errors; they are folded into the reply so
//! the caller always has something to show.

use crate::error::ChatError;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Normalized reply from the webhook relay
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// HTTP-style status code: 200 on success, 400 or 500 on failure
    pub status: u16,
    /// Text to show the user
    pub response: String,
}

/// Relay that forwards chat messages to a configured webhook
pub struct ChatProxy {
    client: Client,
    webhook_url: String,
}

impl ChatProxy {
    pub fn new(webhook_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            webhook_url,
        }
    }

    /// Forward a message and normalize the webhook's answer
    ///
    /// A missing or blank message is rejected with status 400 without
    /// contacting the webhook.
    pub async fn handle(&self, message: Option<&str>) -> ChatReply {
        let message = match message {
            Some(m) if !m.trim().is_empty() => m,
            _ => {
                return ChatReply {
                    status: 400,
                    response: "Please provide a message.".to_string(),
                }
            }
        };

        match self.forward(message).await {
            Ok(text) => ChatReply {
                status: 200,
                response: text,
            },
            Err(e) => {
                warn!("Chat webhook request failed: {}", e);
                ChatReply {
                    status: 500,
                    response: format!("Connection error: {}", e),
                }
            }
        }
    }

    async fn forward(&self, message: &str) -> Result<String, ChatError> {
        debug!("Forwarding chat message to webhook");

        let response = self
            .client
            .get(&self.webhook_url)
            .query(&[("chatInput", message)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::UpstreamStatus { status, body });
        }

        let body = response.text().await?;
        Ok(extract_reply(&body))
    }
}

/// Shapes a webhook workflow may answer with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WebhookPayload {
    /// A list of results; only the first is shown
    Sequence(Vec<Value>),
    /// A single result object with a well-known text field
    Object(serde_json::Map<String, Value>),
    /// A bare value, typically a plain string
    Other(Value),
}

/// Extract display text from a webhook response body
///
/// Arrays are unwrapped to their first element, then the `output`,
/// `response`, and `text` fields are tried in order; anything unrecognized
/// is stringified. A body that is not JSON at all is returned verbatim.
pub fn extract_reply(body: &str) -> String {
    let payload: WebhookPayload = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => return body.to_string(),
    };

    let value = match payload {
        WebhookPayload::Sequence(mut items) if !items.is_empty() => items.remove(0),
        WebhookPayload::Sequence(_) => Value::Array(Vec::new()),
        WebhookPayload::Object(map) => Value::Object(map),
        WebhookPayload::Other(v) => v,
    };

    match &value {
        Value::Object(map) => {
            for key in ["output", "response", "text"] {
                if let Some(field) = map.get(key) {
                    return value_to_text(field);
                }
            }
            value.to_string()
        }
        _ => value_to_text(&value),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_reply_from_output_field() {
        let body = r#"{"output": "Take your medication at 9am."}"#;
        assert_eq!(extract_reply(body), "Take your medication at 9am.");
    }

    #[test]
    fn test_extract_reply_field_precedence() {
        let body = r#"{"text": "third", "response": "second", "output": "first"}"#;
        assert_eq!(extract_reply(body), "first");

        let body = r#"{"text": "third", "response": "second"}"#;
        assert_eq!(extract_reply(body), "second");

        let body = r#"{"text": "third"}"#;
        assert_eq!(extract_reply(body), "third");
    }

    #[test]
    fn test_extract_reply_unwraps_array() {
        let body = r#"[{"output": "from the first element"}, {"output": "ignored"}]"#;
        assert_eq!(extract_reply(body), "from the first element");
    }

    #[test]
    fn test_extract_reply_bare_string() {
        let body = r#""just a string""#;
        assert_eq!(extract_reply(body), "just a string");
    }

    #[test]
    fn test_extract_reply_unknown_object_is_stringified() {
        let body = r#"{"unexpected": 42}"#;
        assert_eq!(extract_reply(body), r#"{"unexpected":42}"#);
    }

    #[test]
    fn test_extract_reply_non_string_field_is_stringified() {
        let body = r#"{"output": {"nested": true}}"#;
        assert_eq!(extract_reply(body), r#"{"nested":true}"#);
    }

    #[test]
    fn test_extract_reply_non_json_body_is_verbatim() {
        assert_eq!(extract_reply("plain text answer"), "plain text answer");
    }

    #[test]
    fn test_extract_reply_empty_array() {
        assert_eq!(extract_reply("[]"), "[]");
    }

    #[tokio::test]
    async fn test_handle_rejects_missing_message() {
        let proxy = ChatProxy::new("http://localhost:1/webhook".to_string());

        let reply = proxy.handle(None).await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.response, "Please provide a message.");
    }

    #[tokio::test]
    async fn test_handle_rejects_blank_message() {
        let proxy = ChatProxy::new("http://localhost:1/webhook".to_string());

        let reply = proxy.handle(Some("   ")).await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.response, "Please provide a message.");
    }

    #[tokio::test]
    async fn test_handle_unreachable_webhook_reports_connection_error() {
        // Port 1 refuses connections, so the request fails fast
        let proxy = ChatProxy::new("http://127.0.0.1:1/webhook".to_string());

        let reply = proxy.handle(Some("hello")).await;
        assert_eq!(reply.status, 500);
        assert!(reply.response.starts_with("Connection error: "));
    }
}
