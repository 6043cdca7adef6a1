use std::env;

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Process-wide settings, loaded once from the environment at startup and
/// threaded explicitly through server construction instead of read back out
/// of ambient globals at request time.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub base_url: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_use_utc: bool,
    pub local_agent_workspace_root: Option<String>,
    pub webhook_dispatch_throttle_ms: u64,
    pub bind_addr: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_use_utc: true,
            local_agent_workspace_root: None,
            webhook_dispatch_throttle_ms: 250,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl ControlPlaneConfig {
    /// Loads config from environment variables, falling back to defaults for
    /// anything unset or empty.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: non_empty_env("BASE_URL").unwrap_or(defaults.base_url),
            log_level: non_empty_env("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: non_empty_env("LOG_FORMAT")
                .map(|value| LogFormat::from_env_value(&value))
                .unwrap_or(defaults.log_format),
            log_use_utc: non_empty_env("LOG_USE_UTC")
                .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
                .unwrap_or(defaults.log_use_utc),
            local_agent_workspace_root: non_empty_env("LOCAL_AGENT_WORKSPACE_ROOT"),
            webhook_dispatch_throttle_ms: non_empty_env("WEBHOOK_DISPATCH_THROTTLE_MS")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.webhook_dispatch_throttle_ms),
            bind_addr: non_empty_env("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ControlPlaneConfig::default();
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.webhook_dispatch_throttle_ms, 250);
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("weird"), LogFormat::Text);
    }
}
