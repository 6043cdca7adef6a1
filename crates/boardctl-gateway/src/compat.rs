use serde_json::{json, Value};

use crate::client::GatewayClient;
use crate::error::GatewayError;

/// Minimum gateway version this control plane can provision against.
pub const MINIMUM_GATEWAY_VERSION: &str = "2026.1.30";

const PROBE_METHODS: &[&str] = &["config.schema", "connect-metadata", "status", "health"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityResult {
    pub compatible: bool,
    pub current: String,
    pub minimum: String,
    pub message: Option<String>,
}

fn extract_semver(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => looks_like_semver(s).then(|| s.clone()),
        Value::Object(map) => {
            for key in ["version", "gateway_version", "server_version"] {
                if let Some(Value::String(s)) = map.get(key) {
                    if looks_like_semver(s) {
                        return Some(s.clone());
                    }
                }
            }
            None
        }
        _ => None,
    }
}

fn looks_like_semver(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() >= 3
        && parts
            .iter()
            .all(|p| p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty())
}

fn version_parts(value: &str) -> Vec<u64> {
    value
        .split('.')
        .map(|p| p.parse::<u64>().unwrap_or(0))
        .collect()
}

fn version_at_least(current: &str, minimum: &str) -> bool {
    version_parts(current) >= version_parts(minimum)
}

/// Probes `config.schema` → connect-metadata → `status` → `health`, in
/// order, using the first response that carries a recognizable semver
/// string. Used once per gateway before attach, per spec §3.
pub async fn check_compatibility(
    client: &GatewayClient,
) -> Result<CompatibilityResult, GatewayError> {
    let mut last_error: Option<GatewayError> = None;

    for method in PROBE_METHODS {
        match client.call(method, json!({})).await {
            Ok(value) => {
                if let Some(current) = extract_semver(&value) {
                    let compatible = version_at_least(&current, MINIMUM_GATEWAY_VERSION);
                    let message = if compatible {
                        None
                    } else {
                        Some(format!("Gateway version {current} is not supported."))
                    };
                    return Ok(CompatibilityResult {
                        compatible,
                        current,
                        minimum: MINIMUM_GATEWAY_VERSION.to_string(),
                        message,
                    });
                }
            }
            Err(err) => last_error = Some(err),
        }
    }

    Err(last_error.unwrap_or(GatewayError::MalformedResponse))
}
