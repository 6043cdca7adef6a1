//! Webhook ingestion (spec.md §4.7 steps 1-6): body decoding, header
//! capture, and the payload/memory/queue-item rows a POST to a webhook's
//! ingest path produces. The HTTP-facing resolve / 410 / 404 handling and
//! the 202 response live in `boardctl-api`; this module only covers the
//! pure decode-and-build logic so it's testable without a server.

use std::collections::BTreeMap;

use boardctl_core::ids::new_id;
use boardctl_types::json::Json;
use boardctl_types::model::{BoardId, BoardMemory, BoardWebhookPayload, WebhookId};
use chrono::{DateTime, Utc};

use crate::queue::WebhookQueueItem;

const MEMORY_PREVIEW_LEN: usize = 400;

/// Decodes a webhook body per spec.md §4.7 step 2: JSON content type, or a
/// JSON-shaped prefix, is parsed; anything else (or a parse failure) is
/// stored as the raw string.
pub fn decode_body(content_type: Option<&str>, body: &str) -> Json {
    let looks_json = content_type
        .map(|ct| ct.to_lowercase().contains("application/json"))
        .unwrap_or(false)
        || Json::looks_json_shaped(body);

    if looks_json {
        if let Ok(parsed) = Json::parse(body) {
            return parsed;
        }
    }
    Json::String(body.to_string())
}

/// Captures only the headers spec.md §4.7 step 3 names: exact
/// `content-type`, exact `user-agent`, or any `x-`-prefixed name
/// (case-insensitive on the name).
pub fn capture_headers<'a>(
    headers: impl Iterator<Item = (&'a str, &'a str)>,
) -> BTreeMap<String, String> {
    headers
        .filter_map(|(name, value)| {
            let lowered = name.to_lowercase();
            if lowered == "content-type" || lowered == "user-agent" || lowered.starts_with("x-") {
                Some((lowered, value.to_string()))
            } else {
                None
            }
        })
        .collect()
}

/// Short human-readable preview of a decoded payload for the board-memory
/// row and the lead-notification message (spec.md §4.7 step 4, §4.7
/// dispatcher).
pub fn payload_preview(payload: &Json, max_len: usize) -> String {
    let rendered = serde_json::to_string(payload).unwrap_or_default();
    if rendered.chars().count() > max_len {
        let truncated: String = rendered.chars().take(max_len).collect();
        format!("{truncated}…")
    } else {
        rendered
    }
}

/// The three rows a single webhook delivery produces (spec.md §4.7 steps
/// 4-5): the stored payload, the non-chat memory row with its preview and
/// inspect URL, and the queue item ready to hand to the delivery queue.
pub struct IngestedWebhook {
    pub payload: BoardWebhookPayload,
    pub memory: BoardMemory,
    pub queue_item: WebhookQueueItem,
}

/// Builds the three rows for one webhook POST. `inspect_url` is the
/// absolute path the memory row's preview links back to the full payload.
#[allow(clippy::too_many_arguments)]
pub fn ingest<'a>(
    board_id: BoardId,
    webhook_id: WebhookId,
    content_type: Option<&str>,
    source_ip: Option<String>,
    headers: impl Iterator<Item = (&'a str, &'a str)>,
    body: &str,
    inspect_url: &str,
    now: DateTime<Utc>,
) -> IngestedWebhook {
    let decoded = decode_body(content_type, body);
    let payload_id = new_id();
    let payload = BoardWebhookPayload {
        id: payload_id,
        board_id,
        webhook_id,
        payload: decoded.clone(),
        headers: capture_headers(headers),
        source_ip,
        content_type: content_type.map(str::to_string),
        received_at: now,
    };

    let preview = payload_preview(&decoded, MEMORY_PREVIEW_LEN);
    let memory = BoardMemory {
        id: new_id(),
        board_id,
        is_chat: false,
        content: format!("Webhook payload received:\n{preview}\n\nInspect: {inspect_url}"),
        tags: vec![
            "webhook".to_string(),
            format!("webhook:{webhook_id}"),
            format!("payload:{payload_id}"),
        ],
        source: Some("webhook".to_string()),
        created_at: now,
    };

    let queue_item = WebhookQueueItem::first_attempt(board_id, webhook_id, payload_id, now);

    IngestedWebhook {
        payload,
        memory,
        queue_item,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_type_parses_even_without_shape_sniff() {
        let decoded = decode_body(Some("application/json"), r#"{"x":1}"#);
        assert!(matches!(decoded, Json::Object(_)));
    }

    #[test]
    fn json_shaped_body_parses_without_content_type() {
        let decoded = decode_body(None, "[1,2,3]");
        assert!(matches!(decoded, Json::Array(_)));
    }

    #[test]
    fn parse_failure_falls_back_to_raw_string() {
        let decoded = decode_body(Some("application/json"), "{not json");
        assert_eq!(decoded, Json::String("{not json".to_string()));
    }

    #[test]
    fn plain_text_body_is_stored_as_string() {
        let decoded = decode_body(Some("text/plain"), "hello there");
        assert_eq!(decoded, Json::String("hello there".to_string()));
    }

    #[test]
    fn capture_headers_keeps_only_named_and_x_prefixed() {
        let headers = vec![
            ("Content-Type", "application/json"),
            ("X-Request-Id", "abc"),
            ("Authorization", "Bearer secret"),
            ("User-Agent", "curl/8"),
        ];
        let captured = capture_headers(headers.into_iter());
        assert_eq!(captured.len(), 3);
        assert!(captured.contains_key("x-request-id"));
        assert!(!captured.contains_key("authorization"));
    }

    #[test]
    fn preview_truncates_long_payloads() {
        let payload = Json::String("x".repeat(500));
        let preview = payload_preview(&payload, 50);
        assert!(preview.chars().count() <= 51);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn ingest_builds_payload_memory_and_queue_item() {
        let board_id = uuid::Uuid::new_v4();
        let webhook_id = uuid::Uuid::new_v4();
        let headers = vec![("Content-Type", "application/json"), ("X-Source", "github")];
        let result = ingest(
            board_id,
            webhook_id,
            Some("application/json"),
            Some("203.0.113.9".to_string()),
            headers.into_iter(),
            r#"{"action":"opened"}"#,
            "/api/v1/boards/x/webhooks/y/payloads/z",
            Utc::now(),
        );

        assert_eq!(result.payload.board_id, board_id);
        assert_eq!(result.payload.webhook_id, webhook_id);
        assert!(matches!(result.payload.payload, Json::Object(_)));
        assert_eq!(result.payload.headers.len(), 2);
        assert!(!result.memory.is_chat);
        assert!(result.memory.content.contains("Inspect:"));
        assert_eq!(result.queue_item.payload_id, result.payload.id);
        assert_eq!(result.queue_item.attempts, 0);
    }
}
