use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A parsed-once JSON value. Webhook payloads and free-form profile maps are
/// decoded into this shape at ingestion and never re-parsed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Json {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Json>),
    Object(BTreeMap<String, Json>),
}

impl Json {
    /// Parses `raw` as JSON. Callers that want "always succeeds" behavior
    /// should fall back to `Json::String` themselves on error, matching the
    /// ingestion rule in spec §4.7 (parse failure stores the raw string).
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// True when `raw`'s first non-whitespace byte suggests a JSON shape
    /// (object, array, quoted string, or boolean literal), matching the
    /// webhook content sniffing rule in spec §4.7 step 2.
    pub fn looks_json_shaped(raw: &str) -> bool {
        let trimmed = raw.trim_start();
        trimmed.starts_with('{')
            || trimmed.starts_with('[')
            || trimmed.starts_with('"')
            || trimmed.starts_with("true")
            || trimmed.starts_with("false")
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Json::String(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Json {
    fn from(value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(json) => json,
            Err(_) => Json::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_json_shaped_recognizes_common_prefixes() {
        assert!(Json::looks_json_shaped(r#"{"x":1}"#));
        assert!(Json::looks_json_shaped("[1,2]"));
        assert!(Json::looks_json_shaped("\"hi\""));
        assert!(Json::looks_json_shaped("true"));
        assert!(!Json::looks_json_shaped("plain text"));
    }

    #[test]
    fn parse_failure_is_surfaced_as_error_not_panic() {
        assert!(Json::parse("{not json").is_err());
    }
}
