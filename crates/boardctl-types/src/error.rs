use serde::Serialize;
use thiserror::Error;

use crate::model::TaskId;

/// Structured conflict body for a blocked task transition (spec §6.2).
#[derive(Debug, Clone, Serialize)]
pub struct BlockedByBody {
    pub code: &'static str,
    pub blocked_by_task_ids: Vec<TaskId>,
}

/// Domain error taxonomy shared by every control-plane crate. Each variant
/// carries its own HTTP status via `http_status`, matching the table in
/// spec §6.2.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("missing required field: {field}")]
    InvalidInput { field: String },

    #[error("malformed identifier: {value}")]
    MalformedIdentifier { value: String },

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("not found")]
    NotFound,

    #[error("task is blocked by incomplete dependencies")]
    TaskBlocked { blocked_by: Vec<TaskId> },

    #[error("state conflict: {reason}")]
    Conflict { reason: String },

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl DomainError {
    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::InvalidInput { .. } | DomainError::MalformedIdentifier { .. } => 422,
            DomainError::Unauthenticated => 401,
            DomainError::AuthorizationDenied { .. } => 403,
            DomainError::NotFound => 404,
            DomainError::TaskBlocked { .. } | DomainError::Conflict { .. } => 409,
            DomainError::Invariant(_) => 500,
        }
    }

    pub fn blocked_body(&self) -> Option<BlockedByBody> {
        match self {
            DomainError::TaskBlocked { blocked_by } => Some(BlockedByBody {
                code: "task_blocked_cannot_transition",
                blocked_by_task_ids: blocked_by.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn status_codes_match_spec_table() {
        assert_eq!(
            DomainError::InvalidInput {
                field: "name".into()
            }
            .http_status(),
            422
        );
        assert_eq!(DomainError::Unauthenticated.http_status(), 401);
        assert_eq!(
            DomainError::AuthorizationDenied { reason: "x".into() }.http_status(),
            403
        );
        assert_eq!(DomainError::NotFound.http_status(), 404);
        assert_eq!(
            DomainError::TaskBlocked {
                blocked_by: vec![Uuid::new_v4()]
            }
            .http_status(),
            409
        );
        assert_eq!(DomainError::Invariant("boom".into()).http_status(), 500);
    }

    #[test]
    fn blocked_body_only_present_for_task_blocked() {
        let blocked = DomainError::TaskBlocked {
            blocked_by: vec![Uuid::new_v4()],
        };
        assert!(blocked.blocked_body().is_some());
        assert!(DomainError::NotFound.blocked_body().is_none());
    }
}
