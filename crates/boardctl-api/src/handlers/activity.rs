//! `GET /activity`, `GET /activity/task-comments`,
//! `GET /activity/task-comments/stream` (spec.md §6.1, §4.6).

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use uuid::Uuid;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::scope::visible_board_ids;
use crate::sse::{polling_sse_stream, PolledEvent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    since: Option<DateTime<Utc>>,
    board_id: Option<Uuid>,
}

fn board_ids_for(state: &AppState, auth: &Authenticated, filter: Option<Uuid>) -> Vec<Uuid> {
    let visible = visible_board_ids(&state.store, auth);
    match filter {
        Some(board_id) => visible.into_iter().filter(|id| *id == board_id).collect(),
        None => visible,
    }
}

pub async fn list_activity(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board_ids = board_ids_for(&state, &auth, query.board_id);
    let since = query.since.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let events = state.store.list_activity_since(&board_ids, since);
    Ok(Json(json!({ "activity": events })))
}

pub async fn list_task_comments(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board_ids = board_ids_for(&state, &auth, query.board_id);
    let since = query.since.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let comments = state.store.list_comments_since(&board_ids, since);
    Ok(Json(json!({ "comments": comments })))
}

pub async fn stream_task_comments(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<ActivityQuery>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let board_ids = board_ids_for(&state, &auth, query.board_id);
    let since = query.since.unwrap_or_else(Utc::now);
    let store = state.store.clone();
    polling_sse_stream(since, move |cursor| {
        store
            .list_comments_since(&board_ids, cursor)
            .into_iter()
            .filter(|event| event.created_at > cursor)
            .map(|event| PolledEvent {
                at: event.created_at,
                id: event.id,
                event_name: "comment",
                payload: json!({ "comment": event }),
            })
            .collect()
    })
}
