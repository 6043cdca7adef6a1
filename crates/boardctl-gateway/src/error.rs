use thiserror::Error;

/// Errors surfaced by calls to an OpenClaw-compatible gateway. Distinct
/// from `boardctl_types::DomainError`: this is the lower layer a gateway
/// call can fail with, before it gets mapped (or retried away) by callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("gateway returned error: {0}")]
    Rpc(String),

    #[error("gateway unreachable after 10 minutes (template sync timeout). Last error: {0}")]
    Timeout(String),

    #[error("gateway response did not contain a usable result")]
    MalformedResponse,

    #[error("gateway is not configured for provisioning")]
    NotProvisionable,
}

impl GatewayError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Remediation guidance for a scope-missing error (spec.md §7 row 4:
    /// "Scope errors are surfaced with remediation guidance naming the
    /// missing scope"), matching the original's
    /// `"missing required scope \`<scope>\`"` wording. `None` when this
    /// error doesn't name a missing scope.
    pub fn scope_guidance(&self) -> Option<String> {
        missing_scope(&self.message()).map(|scope| format!("missing required scope `{scope}`"))
    }
}

/// Extracts the scope name out of a gateway error message containing the
/// literal marker `missing scope: <scope>`.
fn missing_scope(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let marker = "missing scope:";
    let start = lower.find(marker)? + marker.len();
    let rest = &message[start..];
    let scope: String = rest
        .trim()
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '"' && *c != ',')
        .collect();
    if scope.is_empty() {
        None
    } else {
        Some(scope)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_guidance_reformats_missing_scope_message() {
        let err = GatewayError::Rpc("missing scope: operator.read".to_string());
        assert_eq!(
            err.scope_guidance(),
            Some("missing required scope `operator.read`".to_string())
        );
    }

    #[test]
    fn scope_guidance_is_none_for_unrelated_errors() {
        let err = GatewayError::Rpc("connection refused".to_string());
        assert_eq!(err.scope_guidance(), None);
    }
}
