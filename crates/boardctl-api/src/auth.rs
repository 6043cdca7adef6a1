//! Actor resolution (spec.md §6.1): every non-ingest request carries
//! either a user session token or an agent token, both sent as a bearer
//! credential; the actor is resolved into the board engine's
//! `ActorContext`.
//!
//! No session/identity-provider subsystem is modeled (spec.md §1
//! Non-goals: "organization/member/role admin CRUD" is out of scope, and
//! no session-token table exists in the data model), so a bearer token of
//! the form `member:<member_id>` resolves directly to that membership
//! record; anything else is hashed and matched against a stored
//! `agent_token_hash`. A real deployment would swap this for whatever the
//! identity provider issues — this is documented in DESIGN.md.

use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use boardctl_provision::tokens::hash_token;
use boardctl_types::model::{Agent, Member};
use boardctl_types::ActorContext;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// The resolved caller plus whichever domain record backs it, handed to
/// every authorization check in `boardctl-board`.
#[derive(Clone)]
pub struct Authenticated {
    pub actor: ActorContext,
    pub member: Option<Member>,
    pub agent: Option<Agent>,
}

impl Authenticated {
    fn resolve(state: &AppState, bearer: &str) -> Result<Self, ApiError> {
        if let Some(raw_member_id) = bearer.strip_prefix("member:") {
            let member_id =
                Uuid::parse_str(raw_member_id).map_err(|_| ApiError::unauthenticated())?;
            let member = state
                .store
                .get_member(member_id)
                .ok_or_else(ApiError::unauthenticated)?;
            return Ok(Self {
                actor: ActorContext::User { member_id },
                member: Some(member),
                agent: None,
            });
        }

        let agent = state
            .store
            .find_agent_by_token_hash(&hash_token(bearer))
            .ok_or_else(ApiError::unauthenticated)?;
        Ok(Self {
            actor: ActorContext::Agent {
                agent_id: agent.id,
                is_board_lead: agent.is_board_lead,
            },
            member: None,
            agent: Some(agent),
        })
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthenticated())?;
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::unauthenticated)?;
        let bearer = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        if bearer.is_empty() {
            return Err(ApiError::unauthenticated());
        }
        Self::resolve(&state, bearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardctl_core::Store;
    use boardctl_types::model::{AgentStatus, HeartbeatConfig, MemberRole};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn state() -> AppState {
        let (sender, _receiver) = boardctl_webhooks::channel(4);
        AppState::new(Arc::new(Store::new()), sender, Default::default())
    }

    #[test]
    fn member_bearer_resolves_to_user_actor() {
        let state = state();
        let member = Member {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: MemberRole::Member,
            board_write_grants: vec![],
        };
        state.store.insert_member(member.clone());

        let resolved = Authenticated::resolve(&state, &format!("member:{}", member.id)).unwrap();
        assert!(resolved.actor.is_user());
        assert_eq!(resolved.member.unwrap().id, member.id);
    }

    #[test]
    fn agent_bearer_hashes_to_stored_token() {
        let state = state();
        let token = "bctl_sometoken";
        let agent = Agent {
            id: Uuid::new_v4(),
            board_id: Some(Uuid::new_v4()),
            name: "Scout".to_string(),
            is_board_lead: false,
            openclaw_session_id: None,
            heartbeat_config: HeartbeatConfig::default(),
            identity_profile: BTreeMap::new(),
            identity_template: None,
            soul_template: None,
            agent_token_hash: Some(hash_token(token)),
            status: AgentStatus::Online,
            last_seen_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.store.insert_agent(agent.clone());

        let resolved = Authenticated::resolve(&state, token).unwrap();
        assert_eq!(resolved.actor.agent_id(), Some(agent.id));
    }

    #[test]
    fn unknown_bearer_is_unauthenticated() {
        let state = state();
        assert!(Authenticated::resolve(&state, "nonsense").is_err());
    }
}
