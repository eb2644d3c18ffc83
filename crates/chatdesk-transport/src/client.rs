// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat backend.
//!
//! One-shot requests (delivery, session allocation) carry the configured
//! request timeout. The event stream request only bounds the connect phase
//! since it stays open indefinitely.

use std::time::Duration;

use chatdesk_config::model::TransportConfig;
use chatdesk_core::ChatdeskError;
use chatdesk_core::types::{DeliveryAck, OutboundDelivery, RemoteSession, VisitorInfo};
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::debug;

use crate::sse::{self, WireEventStream};

/// HTTP client bound to one chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    events_url: String,
    messages_url: String,
    sessions_url: String,
    request_timeout: Duration,
}

impl ChatClient {
    /// Build a client for `base_url` using the paths in `config`.
    pub fn new(base_url: &str, config: &TransportConfig) -> Result<Self, ChatdeskError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| ChatdeskError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            events_url: format!("{base}{}", config.events_path),
            messages_url: format!("{base}{}", config.messages_path),
            sessions_url: format!("{base}{}", config.sessions_path),
            request_timeout,
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }

    /// `POST {base}/messages`. Any non-success status is a delivery failure.
    pub async fn send_message(
        &self,
        payload: &OutboundDelivery,
    ) -> Result<DeliveryAck, ChatdeskError> {
        let response = self
            .client
            .post(&self.messages_url)
            .timeout(self.request_timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| ChatdeskError::Delivery {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        debug!(status = %status, session_id = %payload.session_id, "delivery response received");
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatdeskError::Delivery {
                message: format!("backend returned {status}: {body}"),
            });
        }

        // The acknowledgment is opaque; keep non-JSON bodies as a string.
        let ack = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
        Ok(DeliveryAck(ack))
    }

    /// `POST {base}/sessions` to allocate a session id.
    pub async fn create_session(
        &self,
        visitor: &VisitorInfo,
    ) -> Result<RemoteSession, ChatdeskError> {
        let response = self
            .client
            .post(&self.sessions_url)
            .timeout(self.request_timeout)
            .json(visitor)
            .send()
            .await
            .map_err(|e| ChatdeskError::Transport {
                message: format!("session request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatdeskError::Transport {
                message: format!("backend returned {status}: {body}"),
                source: None,
            });
        }

        let body = response.text().await.map_err(|e| ChatdeskError::Transport {
            message: format!("failed to read session response: {e}"),
            source: Some(Box::new(e)),
        })?;
        let remote: RemoteSession =
            serde_json::from_str(&body).map_err(|e| ChatdeskError::Transport {
                message: format!("failed to parse session response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if remote.id.trim().is_empty() {
            return Err(ChatdeskError::Transport {
                message: "backend allocated an empty session id".into(),
                source: None,
            });
        }
        Ok(remote)
    }

    /// Open the inbound event stream.
    pub async fn open_events(&self) -> Result<WireEventStream, ChatdeskError> {
        let response = self
            .client
            .get(&self.events_url)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await
            .map_err(|e| ChatdeskError::Transport {
                message: format!("event stream connect failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatdeskError::Transport {
                message: format!("event stream returned {status}"),
                source: None,
            });
        }
        Ok(sse::parse_event_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_core::Sender;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatClient {
        ChatClient::new(&server.uri(), &TransportConfig::default()).unwrap()
    }

    fn delivery() -> OutboundDelivery {
        OutboundDelivery {
            text: "Hi back".into(),
            session_id: "s1".into(),
            sender: Sender::Admin,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn send_message_posts_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_json(serde_json::json!({
                "text": "Hi back",
                "sessionId": "s1",
                "sender": "admin",
                "attachments": []
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let ack = client_for(&server).send_message(&delivery()).await.unwrap();
        assert_eq!(ack.0["ok"], true);
    }

    #[tokio::test]
    async fn send_message_non_success_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_message(&delivery())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatdeskError::Delivery { .. }), "got {err:?}");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn create_session_returns_allocated_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .and(body_json(serde_json::json!({"name": "Ahmad", "pageUrl": "/generators"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "srv-42",
                "name": "Ahmad",
                "pageUrl": "/generators",
                "status": "active",
                "createdAt": "2026-03-01T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let visitor = VisitorInfo {
            page_url: Some("/generators".into()),
            ..VisitorInfo::named("Ahmad")
        };
        let remote = client_for(&server).create_session(&visitor).await.unwrap();
        assert_eq!(remote.id, "srv-42");
        assert!(remote.created_at.is_some());
    }

    #[tokio::test]
    async fn create_session_failure_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_session(&VisitorInfo::named("Sara"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatdeskError::Transport { .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_fails_delivery() {
        // Nothing listens on port 9 (discard) in the test environment.
        let client = ChatClient::new("http://127.0.0.1:9", &TransportConfig::default()).unwrap();
        assert!(client.send_message(&delivery()).await.is_err());
    }

    #[test]
    fn urls_join_without_double_slash() {
        let client = ChatClient::new("http://chat.local/api/", &TransportConfig::default()).unwrap();
        assert_eq!(client.events_url(), "http://chat.local/api/events");
    }
}
