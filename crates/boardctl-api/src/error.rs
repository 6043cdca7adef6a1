//! Top-level API error type. Every handler returns `Result<_, ApiError>`;
//! a single `IntoResponse` impl maps every error kind to the HTTP status
//! table in spec.md §6.1/§7, so no handler hand-rolls a status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use boardctl_gateway::GatewayError;
use boardctl_types::DomainError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    blocked_by_task_ids: Option<Vec<uuid::Uuid>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            blocked_by_task_ids: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing or invalid credentials",
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_input", message)
    }

    /// Gateway unreachable or version-incompatible (spec.md §6.1 error
    /// table row: "Gateway unreachable or version incompatible" → 502).
    pub fn gateway_unreachable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "gateway_unreachable", message)
    }

    /// Disabled resource (spec.md §6.1: `410`), used for a disabled
    /// webhook's ingest path.
    pub fn disabled(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, "disabled", message)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &err {
            DomainError::InvalidInput { .. } => "invalid_input",
            DomainError::MalformedIdentifier { .. } => "malformed_identifier",
            DomainError::Unauthenticated => "unauthenticated",
            DomainError::AuthorizationDenied { .. } => "authorization_denied",
            DomainError::NotFound => "not_found",
            DomainError::TaskBlocked { .. } => "task_blocked_cannot_transition",
            DomainError::Conflict { .. } => "conflict",
            DomainError::Invariant(_) => "internal_invariant_violated",
        };
        let blocked_by_task_ids = err.blocked_body().map(|b| b.blocked_by_task_ids);
        Self {
            status,
            code,
            message: err.to_string(),
            blocked_by_task_ids,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let message = err.scope_guidance().unwrap_or_else(|| err.message());
        Self::gateway_unreachable(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        if let Some(blocked_by_task_ids) = self.blocked_by_task_ids {
            body["error"]["blocked_by_task_ids"] = json!(blocked_by_task_ids);
        }
        (self.status, Json(body)).into_response()
    }
}
