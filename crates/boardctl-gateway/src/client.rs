use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::warn;

use crate::backoff::{is_transient_gateway_error, GatewayBackoff};
use crate::error::GatewayError;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

fn new_request_id() -> String {
    let count = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("boardctl-{count}")
}

#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout_ms: u64,
}

/// JSON-RPC client for an OpenClaw-compatible gateway, transported over a
/// plain HTTP POST of a `{method, params}` envelope (gateways in this
/// deployment are fronted by an HTTP reverse proxy, not a raw socket).
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayClientConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayClientConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self { http, config })
    }

    /// Issues a single JSON-RPC call with no retry. Callers wanting
    /// deadline-bounded retry on transient failures should use
    /// [`GatewayClient::call_with_backoff`].
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let url = self.config.base_url.trim_end_matches('/').to_string();
        let mut request = self
            .http
            .post(&url)
            .header("x-boardctl-request-id", new_request_id())
            .json(&json!({ "method": method, "params": params }));

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Rpc(format!("http {status}: {raw}")));
        }

        let body: Value =
            serde_json::from_str(&raw).map_err(|_| GatewayError::MalformedResponse)?;

        if let Some(error) = body.get("error") {
            return Err(GatewayError::Rpc(error.to_string()));
        }

        body.get("result")
            .cloned()
            .ok_or(GatewayError::MalformedResponse)
    }

    /// Runs `call` under a deadline-bounded exponential backoff, retrying
    /// only errors the transient-error classifier accepts. A non-transient
    /// error or an exhausted deadline is returned immediately.
    pub async fn call_with_backoff(
        &self,
        method: &str,
        params: Value,
        backoff: GatewayBackoff,
    ) -> Result<Value, GatewayError> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(backoff.timeout_ms);
        let mut delay_ms = backoff.base_delay_ms;

        loop {
            match self.call(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_transient_gateway_error(&err.message()) {
                        return Err(err);
                    }
                    let remaining_ms = deadline
                        .saturating_duration_since(tokio::time::Instant::now())
                        .as_millis() as u64;
                    let Some(sleep_ms) = backoff.next_sleep_ms(delay_ms, remaining_ms) else {
                        return Err(GatewayError::Timeout(err.message()));
                    };
                    warn!(method, sleep_ms, "retrying transient gateway error");
                    sleep(Duration::from_millis(sleep_ms)).await;
                    delay_ms = backoff.grow(delay_ms);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_client(server: &MockServer) -> GatewayClient {
        GatewayClient::new(GatewayClientConfig {
            base_url: server.url("/"),
            token: Some("tok".to_string()),
            request_timeout_ms: 2_000,
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn call_returns_result_on_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200).json_body(json!({"result": {"ok": true}}));
        });

        let client = test_client(&server);
        let result = client.call("status", json!({})).await.expect("ok");
        assert_eq!(result, json!({"ok": true}));
        mock.assert();
    }

    #[tokio::test]
    async fn call_surfaces_rpc_error_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200)
                .json_body(json!({"error": "missing scope: agents.write"}));
        });

        let client = test_client(&server);
        let err = client.call("agents.list", json!({})).await.unwrap_err();
        assert!(err.message().contains("missing scope"));
    }

    #[tokio::test]
    async fn call_with_backoff_gives_up_immediately_on_non_transient_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200)
                .json_body(json!({"error": "unsupported file"}));
        });

        let client = test_client(&server);
        let backoff = GatewayBackoff {
            timeout_ms: 50,
            base_delay_ms: 10,
            max_delay_ms: 10,
            jitter: 0.0,
        };
        let err = client
            .call_with_backoff("agents.files.set", json!({}), backoff)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rpc(_)));
    }
}
