//! `GET /gateways/status`, `GET /gateways/sessions`,
//! `GET /gateways/sessions/{key}/history`,
//! `POST /gateways/sessions/{key}/message`, `GET /gateways/commands`
//! (spec.md §6.1, §6.2).

use axum::extract::{Path, Query, State};
use axum::Json;
use boardctl_gateway::methods;
use boardctl_types::model::{Gateway, GatewayId};
use serde::Deserialize;
use serde_json::json;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::gateway_access::coordinator_for;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct GatewayScopeQuery {
    gateway_id: Option<GatewayId>,
}

/// Resolves which gateway a `/gateways/*` request targets: the caller's
/// agent/board gateway if they're agent-scoped, an explicit `gateway_id`
/// query param for a member, or the sole gateway in the member's org if
/// there's exactly one (no gateway-selection UX is in scope).
fn resolve_gateway(
    state: &AppState,
    auth: &Authenticated,
    requested: Option<GatewayId>,
) -> Result<Gateway, ApiError> {
    if let Some(agent) = &auth.agent {
        let board_id = agent
            .board_id
            .ok_or_else(|| ApiError::not_found("gateway-main agent has no board"))?;
        let board = state
            .store
            .get_board(board_id)
            .ok_or_else(|| ApiError::not_found("board not found"))?;
        let gateway_id = board
            .gateway_id
            .ok_or_else(|| ApiError::not_found("board has no gateway"))?;
        return state
            .store
            .get_gateway(gateway_id)
            .ok_or_else(|| ApiError::not_found("gateway not found"));
    }

    let member = auth.member.as_ref().ok_or_else(ApiError::unauthenticated)?;
    if let Some(gateway_id) = requested {
        let gateway = state
            .store
            .get_gateway(gateway_id)
            .ok_or_else(|| ApiError::not_found("gateway not found"))?;
        if gateway.org_id != member.org_id {
            return Err(ApiError::not_found("gateway not found"));
        }
        return Ok(gateway);
    }

    let mut gateways = state.store.list_gateways_for_org(member.org_id);
    match gateways.len() {
        1 => Ok(gateways.remove(0)),
        0 => Err(ApiError::not_found("org has no configured gateway")),
        _ => Err(ApiError::invalid_input(
            "gateway_id is required when an org has multiple gateways",
        )),
    }
}

pub async fn status(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<GatewayScopeQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let gateway = resolve_gateway(&state, &auth, query.gateway_id)?;
    let coordinator = coordinator_for(&gateway)?;
    let status = coordinator.status().await?;
    Ok(Json(json!({ "gateway_id": gateway.id, "status": status })))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<GatewayScopeQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let gateway = resolve_gateway(&state, &auth, query.gateway_id)?;
    let coordinator = coordinator_for(&gateway)?;
    let sessions = coordinator.list_sessions().await?;
    Ok(Json(
        json!({ "gateway_id": gateway.id, "sessions": sessions }),
    ))
}

pub async fn session_history(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(session_key): Path<String>,
    Query(query): Query<GatewayScopeQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let gateway = resolve_gateway(&state, &auth, query.gateway_id)?;
    let coordinator = coordinator_for(&gateway)?;
    let history = coordinator.get_history(&session_key).await?;
    Ok(Json(
        json!({ "session_key": session_key, "history": history }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    #[serde(default = "default_true")]
    pub deliver: bool,
    #[serde(default)]
    pub gateway_id: Option<GatewayId>,
}

fn default_true() -> bool {
    true
}

pub async fn send_session_message(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(session_key): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let gateway = resolve_gateway(&state, &auth, request.gateway_id)?;
    let coordinator = coordinator_for(&gateway)?;
    let result = coordinator
        .send_message(&session_key, &request.text, request.deliver)
        .await?;
    Ok(Json(
        json!({ "session_key": session_key, "result": result }),
    ))
}

/// No dedicated RPC method backs this in spec.md §6.2's method list; it
/// surfaces the JSON-RPC methods this coordinator actually calls, for
/// operator tooling that wants to know what's available (see DESIGN.md).
pub async fn list_commands() -> Json<serde_json::Value> {
    Json(json!({
        "commands": [
            methods::SESSIONS_LIST,
            methods::SESSIONS_GET,
            methods::SESSIONS_RESET,
            methods::SESSIONS_DELETE,
            methods::SESSIONS_SPAWN,
            methods::SESSIONS_SEND,
            methods::SESSIONS_HISTORY,
            methods::AGENTS_LIST,
            methods::AGENTS_FILES_LIST,
            methods::AGENTS_FILES_GET,
            methods::AGENTS_FILES_SET,
            methods::CONFIG_GET,
            methods::CONFIG_PATCH,
            methods::CONFIG_SCHEMA,
            methods::STATUS,
            methods::HEALTH,
        ]
    }))
}
