//! `GET|POST /agents`, `GET /agents/stream`, `PATCH|DELETE /agents/{id}`,
//! `POST /agents/heartbeat` (spec.md §6.1).

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use boardctl_board::{authorization, create_agent, delete_agent, record_heartbeat, NewAgent};
use boardctl_provision::tokens::{generate_token, hash_token};
use boardctl_types::model::{AgentId, BoardId};
use boardctl_types::DomainError;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::scope::visible_board_ids;
use crate::sse::{polling_sse_stream, PolledEvent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BoardScopeQuery {
    board_id: BoardId,
}

pub async fn list_agents(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<BoardScopeQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = state
        .store
        .get_board(query.board_id)
        .ok_or_else(|| ApiError::not_found("board not found"))?;
    authorization::can_list_board_scoped(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    let agents = state.store.list_agents_for_board(board.id);
    Ok(Json(json!({ "agents": agents })))
}

pub async fn create_agent_handler(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
    Json(new_agent): Json<NewAgent>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = create_agent(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        board_id,
        new_agent,
        Utc::now(),
    )?;
    Ok(Json(json!({ "agent": agent })))
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub heartbeat_config: Option<boardctl_types::model::HeartbeatConfig>,
}

pub async fn patch_agent(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(agent_id): Path<AgentId>,
    Json(patch): Json<PatchAgentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut agent = state
        .store
        .get_agent(agent_id)
        .ok_or(DomainError::NotFound)?;
    let board = state
        .store
        .get_board(agent.board_id.ok_or(DomainError::NotFound)?)
        .ok_or(DomainError::NotFound)?;
    authorization::can_create_agent(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;

    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(ApiError::invalid_input("name must not be blank"));
        }
        if state
            .store
            .agent_name_taken(board.id, &name, Some(agent_id))
        {
            return Err(DomainError::Conflict {
                reason: "agent name already used on this board".to_string(),
            }
            .into());
        }
        agent.name = name;
    }
    if let Some(heartbeat_config) = patch.heartbeat_config {
        agent.heartbeat_config = heartbeat_config;
    }
    agent.updated_at = Utc::now();
    state.store.update_agent(agent.clone());
    Ok(Json(json!({ "agent": agent })))
}

pub async fn delete_agent_handler(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(agent_id): Path<AgentId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = delete_agent(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        agent_id,
        Utc::now(),
    )?;
    Ok(Json(json!({ "agent": agent })))
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    /// Only consulted for a first-contact heartbeat from a user/admin
    /// caller that doesn't have an agent token yet (spec.md §6.1: "creates
    /// on first heartbeat if authorized").
    #[serde(default)]
    pub board_id: Option<BoardId>,
    #[serde(default)]
    pub new_agent: Option<NewAgent>,
}

pub async fn heartbeat(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(agent) = &auth.agent {
        let agent = record_heartbeat(&state.store, agent.id, Utc::now())?;
        return Ok(Json(json!({ "agent": agent })));
    }

    let (board_id, new_agent) = match (request.board_id, request.new_agent) {
        (Some(board_id), Some(new_agent)) => (board_id, new_agent),
        _ => {
            return Err(ApiError::invalid_input(
                "board_id and new_agent are required for a first-contact heartbeat",
            ))
        }
    };

    let agent = create_agent(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        None,
        board_id,
        new_agent,
        Utc::now(),
    )?;
    let agent = record_heartbeat(&state.store, agent.id, Utc::now())?;

    let token = generate_token();
    let mut agent = agent;
    agent.agent_token_hash = Some(hash_token(&token));
    state.store.update_agent(agent.clone());

    Ok(Json(json!({ "agent": agent, "agent_token": token })))
}

pub async fn stream_agents(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let board_ids = visible_board_ids(&state.store, &auth);
    let store = state.store.clone();
    polling_sse_stream(Utc::now(), move |cursor| {
        let mut out = Vec::new();
        for board_id in &board_ids {
            for agent in store.list_agents_for_board(*board_id) {
                if agent.updated_at > cursor {
                    out.push(PolledEvent {
                        at: agent.updated_at,
                        id: agent.id,
                        event_name: "agent",
                        payload: json!({ "agent": agent }),
                    });
                }
            }
        }
        out
    })
}
