use serde_json::{json, Value};

use crate::backoff::GatewayBackoff;
use crate::client::GatewayClient;
use crate::error::GatewayError;
use crate::methods;

/// Entry returned by `sessions.spawn`/`sessions.get`, enough for callers to
/// confirm idempotent session creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub key: String,
    pub label: Option<String>,
    pub raw: Value,
}

/// The three routing primitives from the lead/main/user coordination
/// protocol, plus session lifecycle. All calls run under deadline-bounded
/// backoff so a transient gateway blip doesn't fail a nudge outright.
pub struct GatewayCoordinator {
    client: GatewayClient,
    backoff: GatewayBackoff,
}

impl GatewayCoordinator {
    pub fn new(client: GatewayClient) -> Self {
        Self {
            client,
            backoff: GatewayBackoff::default(),
        }
    }

    pub fn with_backoff(client: GatewayClient, backoff: GatewayBackoff) -> Self {
        Self { client, backoff }
    }

    /// Idempotently ensures a session named `key` exists, creating it with
    /// `label` if missing. Calling this repeatedly for the same key must
    /// not create duplicate sessions (spec §8 testable property).
    pub async fn ensure_session(
        &self,
        key: &str,
        label: &str,
    ) -> Result<SessionEntry, GatewayError> {
        let existing = self
            .client
            .call_with_backoff(methods::SESSIONS_GET, json!({ "key": key }), self.backoff)
            .await;

        if let Ok(value) = existing {
            if !value.is_null() {
                return Ok(SessionEntry {
                    key: key.to_string(),
                    label: Some(label.to_string()),
                    raw: value,
                });
            }
        }

        let spawned = self
            .client
            .call_with_backoff(
                methods::SESSIONS_SPAWN,
                json!({ "key": key, "label": label }),
                self.backoff,
            )
            .await?;

        Ok(SessionEntry {
            key: key.to_string(),
            label: Some(label.to_string()),
            raw: spawned,
        })
    }

    /// Posts `text` to `session_key`. `deliver = true` pushes to the agent
    /// immediately; `false` leaves it queued in the inbox.
    pub async fn send_message(
        &self,
        session_key: &str,
        text: &str,
        deliver: bool,
    ) -> Result<Value, GatewayError> {
        self.client
            .call_with_backoff(
                methods::SESSIONS_SEND,
                json!({ "key": session_key, "text": text, "deliver": deliver }),
                self.backoff,
            )
            .await
    }

    /// Raw gateway health/status document (`status` RPC).
    pub async fn status(&self) -> Result<Value, GatewayError> {
        self.client
            .call_with_backoff(methods::STATUS, json!({}), self.backoff)
            .await
    }

    /// Every session currently known to the gateway (`sessions.list` RPC).
    pub async fn list_sessions(&self) -> Result<Value, GatewayError> {
        self.client
            .call_with_backoff(methods::SESSIONS_LIST, json!({}), self.backoff)
            .await
    }

    pub async fn get_history(&self, session_key: &str) -> Result<Value, GatewayError> {
        self.client
            .call_with_backoff(
                methods::SESSIONS_HISTORY,
                json!({ "key": session_key }),
                self.backoff,
            )
            .await
    }

    /// Nudge: lead -> board agent direct message delivered immediately.
    pub async fn nudge_agent(
        &self,
        agent_session_key: &str,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.send_message(agent_session_key, text, true).await?;
        Ok(())
    }

    /// Lead asks user: lead -> gateway-main structured instruction with a
    /// correlation id and the board-memory reply path the main agent
    /// should POST its answer to.
    pub async fn ask_user(
        &self,
        main_session_key: &str,
        correlation_id: &str,
        question: &str,
        preferred_channel: Option<&str>,
        reply_memory_path: &str,
    ) -> Result<(), GatewayError> {
        let text = format!(
            "USER QUESTION (correlation_id={correlation_id})\n\n{question}\n\n\
             Reach the user via your channels{channel_hint}. When answered, POST a non-chat \
             board memory to {reply_memory_path} tagged [\"gateway_main\", \"user_reply\"] \
             with source=\"gateway_main\".",
            channel_hint = preferred_channel
                .map(|c| format!(" (preferred: {c})"))
                .unwrap_or_default(),
        );
        self.send_message(main_session_key, &text, true).await?;
        Ok(())
    }

    /// Main messages lead(s): single-board targeted, or broadcast across
    /// every `(session_key, board_label)` pair the caller resolved. Returns
    /// a per-board sent/failed summary.
    pub async fn message_leads(
        &self,
        targets: &[(String, String)],
        instruction: &str,
    ) -> BroadcastSummary {
        let mut sent = Vec::new();
        let mut failed = Vec::new();

        for (session_key, board_label) in targets {
            match self.send_message(session_key, instruction, true).await {
                Ok(_) => sent.push(board_label.clone()),
                Err(err) => failed.push((board_label.clone(), err.message())),
            }
        }

        BroadcastSummary { sent, failed }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastSummary {
    pub sent: Vec<String>,
    pub failed: Vec<(String, String)>,
}
