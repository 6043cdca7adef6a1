//! `GET|POST|DELETE /boards/{id}/webhooks`,
//! `GET /boards/{id}/webhooks/{wid}/payloads`, and the open-ingest
//! `POST /boards/{id}/webhooks/{wid}` (spec.md §6.1, §4.7).

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use boardctl_board::authorization;
use boardctl_core::ids::new_id;
use boardctl_types::model::{BoardId, BoardWebhook, WebhookId};
use boardctl_types::DomainError;
use boardctl_webhooks::ingest;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::scope::get_board_or_404;
use crate::state::AppState;

pub async fn list_webhooks(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_update_board_meta(&auth.actor, auth.member.as_ref(), &board)?;
    let webhooks = state.store.list_webhooks_for_board(board_id);
    Ok(Json(json!({ "webhooks": webhooks })))
}

#[derive(Debug, Deserialize)]
pub struct NewWebhookRequest {
    pub description: String,
}

pub async fn create_webhook(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
    Json(request): Json<NewWebhookRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_update_board_meta(&auth.actor, auth.member.as_ref(), &board)?;
    let webhook = BoardWebhook {
        id: new_id(),
        board_id,
        description: request.description,
        enabled: true,
        created_at: Utc::now(),
    };
    state.store.insert_webhook(webhook.clone());
    Ok(Json(json!({ "webhook": webhook })))
}

pub async fn delete_webhook(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((board_id, webhook_id)): Path<(BoardId, WebhookId)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_update_board_meta(&auth.actor, auth.member.as_ref(), &board)?;
    let webhook = state
        .store
        .delete_webhook(webhook_id)
        .filter(|w| w.board_id == board_id)
        .ok_or(DomainError::NotFound)?;
    Ok(Json(json!({ "webhook": webhook })))
}

pub async fn list_payloads(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((board_id, webhook_id)): Path<(BoardId, WebhookId)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_update_board_meta(&auth.actor, auth.member.as_ref(), &board)?;
    state
        .store
        .get_webhook(webhook_id)
        .filter(|w| w.board_id == board_id)
        .ok_or(DomainError::NotFound)?;
    let payloads = state.store.list_payloads_for_webhook(webhook_id);
    Ok(Json(json!({ "payloads": payloads })))
}

/// The open ingest path: no bearer auth, identified only by the webhook's
/// own UUID in the URL (spec.md §4.7 step 1).
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path((board_id, webhook_id)): Path<(BoardId, WebhookId)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let webhook = match state
        .store
        .get_webhook(webhook_id)
        .filter(|w| w.board_id == board_id)
    {
        Some(webhook) => webhook,
        None => return ApiError::not_found("webhook not found").into_response(),
    };
    if !webhook.enabled {
        return ApiError::disabled("webhook is disabled").into_response();
    }

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let header_pairs: Vec<(&str, &str)> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect();
    let body_str = String::from_utf8_lossy(&body);
    let inspect_url = format!("/api/v1/boards/{board_id}/webhooks/{webhook_id}/payloads");

    let ingested = ingest(
        board_id,
        webhook_id,
        content_type,
        source_ip,
        header_pairs.into_iter(),
        &body_str,
        &inspect_url,
        Utc::now(),
    );
    let payload_id = ingested.payload.id;

    state.store.insert_webhook_payload(ingested.payload);
    state.store.append_memory(ingested.memory);
    if state
        .webhook_queue
        .try_enqueue(ingested.queue_item)
        .is_err()
    {
        tracing::warn!(%payload_id, "webhook delivery queue full, relying on reconciliation sweep");
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({ "payload_id": payload_id })),
    )
        .into_response()
}
