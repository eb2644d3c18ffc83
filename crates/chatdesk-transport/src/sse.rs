// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for the chat backend's inbound event stream.
//!
//! Converts a reqwest response byte stream into [`WireEvent`]s using the
//! `eventsource-stream` crate. The event type is taken from the SSE `event:`
//! field, falling back to the `type` member of the JSON data.

use std::pin::Pin;

use chatdesk_core::ChatdeskError;
use chatdesk_core::types::WireEvent;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

/// Boxed stream of inbound wire events.
pub type WireEventStream = Pin<Box<dyn Stream<Item = Result<WireEvent, ChatdeskError>> + Send>>;

/// Parse a streaming response into wire events.
///
/// Keep-alives and unknown event types are skipped. A malformed
/// `new_message` payload is logged and skipped. Only failures of the
/// underlying byte stream are yielded as errors.
pub fn parse_event_stream(response: reqwest::Response) -> WireEventStream {
    let mapped = response
        .bytes_stream()
        .eventsource()
        .filter_map(|result| async move {
            match result {
                Ok(event) => decode_event(&event.event, &event.data).map(Ok),
                Err(e) => Some(Err(ChatdeskError::Transport {
                    message: format!("SSE stream error: {e}"),
                    source: None,
                })),
            }
        });
    Box::pin(mapped)
}

fn decode_event(name: &str, data: &str) -> Option<WireEvent> {
    if data.trim().is_empty() {
        return None;
    }
    let mut value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            debug!(event = name, error = %e, "ignoring non-JSON event");
            return None;
        }
    };

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None if name != "message" && !name.is_empty() => name.to_string(),
        None => return None,
    };
    if kind != "new_message" {
        debug!(event = %kind, "skipping unknown event type");
        return None;
    }
    if let Value::Object(obj) = &mut value {
        obj.entry("type").or_insert_with(|| Value::from("new_message"));
    }

    match serde_json::from_value::<WireEvent>(value) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "dropping malformed new_message event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    const MESSAGE: &str = r#"{"id":"m1","text":"Hello","sender":"visitor","timestamp":"2026-01-01T00:00:00Z","status":"sent","sessionId":"s1"}"#;

    #[tokio::test]
    async fn parses_typed_data_on_default_event() {
        let sse = format!(
            "data: {{\"type\":\"new_message\",\"sessionId\":\"s1\",\"message\":{MESSAGE}}}\n\n"
        );
        let mut stream = parse_event_stream(mock_sse_response(&sse).await);

        let WireEvent::NewMessage {
            session_id,
            message,
        } = stream.next().await.unwrap().unwrap();
        assert_eq!(session_id, "s1");
        assert_eq!(message.text, "Hello");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn event_name_supplies_missing_type() {
        let sse = format!("event: new_message\ndata: {{\"sessionId\":\"s2\",\"message\":{MESSAGE}}}\n\n");
        let mut stream = parse_event_stream(mock_sse_response(&sse).await);

        let WireEvent::NewMessage { session_id, .. } = stream.next().await.unwrap().unwrap();
        assert_eq!(session_id, "s2");
    }

    #[tokio::test]
    async fn unknown_and_malformed_events_are_skipped() {
        let sse = format!(
            ": keep-alive\n\n\
             event: typing\ndata: {{\"sessionId\":\"s1\"}}\n\n\
             data: not json\n\n\
             data: {{\"type\":\"new_message\",\"sessionId\":\"s1\"}}\n\n\
             data: {{\"type\":\"new_message\",\"sessionId\":\"s3\",\"message\":{MESSAGE}}}\n\n"
        );
        let mut stream = parse_event_stream(mock_sse_response(&sse).await);

        let WireEvent::NewMessage { session_id, .. } = stream.next().await.unwrap().unwrap();
        assert_eq!(session_id, "s3");
        assert!(stream.next().await.is_none());
    }
}
