//! `GET|POST /boards`, `/boards/{id}/tasks`, `/boards/{id}/memory`,
//! `/boards/{id}/approvals`, `/boards/{id}/onboarding` (spec.md §6.1).

use axum::extract::{Path, State};
use axum::Json;
use boardctl_board::{
    authorization, create_dependency, create_task, delete_task, update_task, NewTask, TaskPatch,
};
use boardctl_core::ids::new_id;
use boardctl_types::model::{
    ActivityEvent, Approval, ApprovalId, ApprovalStatus, Board, BoardId, BoardMemory, OrgId,
    Organization, TaskId,
};
use boardctl_types::policy::DependencyCleanupPolicy;
use boardctl_types::DomainError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::gateway_access::{coordinator_for, gateway_for_board};
use crate::scope::{get_board_or_404, visible_board_ids};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewBoardRequest {
    pub org_id: OrgId,
    pub name: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gateway_id: Option<boardctl_types::model::GatewayId>,
}

pub async fn list_boards(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board_ids = visible_board_ids(&state.store, &auth);
    let boards: Vec<Board> = board_ids
        .into_iter()
        .filter_map(|id| state.store.get_board(id))
        .collect();
    Ok(Json(json!({ "boards": boards })))
}

pub async fn create_board(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<NewBoardRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let member = auth.member.as_ref().ok_or_else(|| {
        ApiError::new(
            axum::http::StatusCode::FORBIDDEN,
            "authorization_denied",
            "only members create boards",
        )
    })?;
    if member.org_id != request.org_id
        || !matches!(member.role, boardctl_types::model::MemberRole::Admin)
    {
        return Err(DomainError::AuthorizationDenied {
            reason: "only an org admin may create boards".to_string(),
        }
        .into());
    }
    if request.name.trim().is_empty() {
        return Err(ApiError::invalid_input("name must not be blank"));
    }
    if state.store.get_organization(request.org_id).is_none() {
        state.store.insert_organization(Organization {
            id: request.org_id,
            name: format!("org-{}", request.org_id),
            created_at: Utc::now(),
        });
    }

    let board = Board {
        id: new_id(),
        org_id: request.org_id,
        name: request.name.trim().to_string(),
        objective: request.objective,
        target_date: request.target_date,
        goal_confirmed: false,
        gateway_id: request.gateway_id,
        created_at: Utc::now(),
    };
    state.store.insert_board(board.clone());
    Ok(Json(json!({ "board": board })))
}

async fn list_tasks_impl(
    state: &AppState,
    auth: &Authenticated,
    board_id: BoardId,
) -> Result<serde_json::Value, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_list_board_scoped(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    let tasks = state.store.list_tasks_for_board(board_id);
    let with_blocked: Vec<serde_json::Value> = tasks
        .iter()
        .map(|task| {
            let blocked_by = boardctl_board::blocked_by_for_task(&state.store, task);
            json!({ "task": task, "blocked_by_task_ids": blocked_by })
        })
        .collect();
    Ok(json!({ "tasks": with_blocked }))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(list_tasks_impl(&state, &auth, board_id).await?))
}

/// `GET /agent/tasks`: an agent's own board, with no board id in the path.
pub async fn list_tasks_for_own_board(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board_id = auth
        .agent
        .as_ref()
        .and_then(|a| a.board_id)
        .ok_or_else(|| ApiError::not_found("caller has no board"))?;
    Ok(Json(list_tasks_impl(&state, &auth, board_id).await?))
}

pub async fn create_task_handler(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
    Json(new_task): Json<NewTask>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = create_task(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        board_id,
        new_task,
        Utc::now(),
    )?;
    maybe_nudge_assignee(&state, board_id, &task).await;
    Ok(Json(json!({ "task": task })))
}

pub async fn patch_task(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((board_id, task_id)): Path<(BoardId, TaskId)>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = update_task(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        task_id,
        patch,
        Utc::now(),
    )?;
    maybe_nudge_assignee(&state, board_id, &task).await;
    Ok(Json(json!({ "task": task })))
}

/// `PATCH /agent/tasks/{task_id}`: same update path, board id derived from
/// the task itself since the agent-mirror surface never carries one.
pub async fn patch_own_task(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(task_id): Path<TaskId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = update_task(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        task_id,
        patch,
        Utc::now(),
    )?;
    maybe_nudge_assignee(&state, task.board_id, &task).await;
    Ok(Json(json!({ "task": task })))
}

pub async fn delete_task_handler(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((_board_id, task_id)): Path<(BoardId, TaskId)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    delete_task(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        task_id,
        DependencyCleanupPolicy::CascadeNull,
        Utc::now(),
    )?;
    Ok(Json(json!({ "deleted": task_id })))
}

#[derive(Debug, Deserialize)]
pub struct NewDependencyRequest {
    pub depends_on_task_id: TaskId,
}

pub async fn create_dependency_handler(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((board_id, task_id)): Path<(BoardId, TaskId)>,
    Json(request): Json<NewDependencyRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    create_dependency(
        &state.store,
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        board_id,
        task_id,
        request.depends_on_task_id,
    )?;
    Ok(Json(json!({
        "task_id": task_id,
        "depends_on_task_id": request.depends_on_task_id,
    })))
}

/// Best-effort outbound nudge on assignment (spec.md §4.4: "assignment to
/// an agent triggers an outbound nudge... best-effort"). Runs after the
/// mutation commits; failure is logged as a `*.failed` activity event, not
/// surfaced to the caller and never rolls back the assignment.
async fn maybe_nudge_assignee(
    state: &AppState,
    board_id: BoardId,
    task: &boardctl_types::model::Task,
) {
    let Some(agent_id) = task.assigned_agent_id else {
        return;
    };
    let Some(agent) = state.store.get_agent(agent_id) else {
        return;
    };
    let Some(board) = state.store.get_board(board_id) else {
        return;
    };
    let result = async {
        let gateway = gateway_for_board(&state.store, &board)?;
        let coordinator = coordinator_for(&gateway)?;
        let session_key = boardctl_provision::session::session_key(&agent);
        coordinator
            .nudge_agent(
                &session_key,
                &format!("You have been assigned task \"{}\".", task.title),
            )
            .await
            .map_err(ApiError::from)
    }
    .await;

    if let Err(err) = result {
        warn!(task_id = %task.id, agent_id = %agent_id, "assignment nudge failed");
        state.store.append_activity(ActivityEvent {
            id: new_id(),
            org_id: board.org_id,
            board_id: Some(board.id),
            event_type: "task.assignment_nudge.failed".to_string(),
            task_id: Some(task.id),
            agent_id: Some(agent_id),
            message: format!("{err:?}"),
            created_at: Utc::now(),
        });
    }
}

async fn list_memory_impl(
    state: &AppState,
    auth: &Authenticated,
    board_id: BoardId,
) -> Result<serde_json::Value, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_list_board_scoped(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    let memory = state.store.list_memory_for_board(board_id, None);
    Ok(json!({ "memory": memory }))
}

pub async fn list_memory(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(list_memory_impl(&state, &auth, board_id).await?))
}

fn own_board_id(auth: &Authenticated) -> Result<BoardId, ApiError> {
    auth.agent
        .as_ref()
        .and_then(|a| a.board_id)
        .ok_or_else(|| ApiError::not_found("caller has no board"))
}

/// `GET /agent/memory`.
pub async fn list_memory_for_own_board(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board_id = own_board_id(&auth)?;
    Ok(Json(list_memory_impl(&state, &auth, board_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewMemoryRequest {
    #[serde(default)]
    pub is_chat: bool,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

async fn append_memory_impl(
    state: &AppState,
    auth: &Authenticated,
    board_id: BoardId,
    request: NewMemoryRequest,
) -> Result<serde_json::Value, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_list_board_scoped(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    if request.content.trim().is_empty() {
        return Err(ApiError::invalid_input("content must not be blank"));
    }
    let memory = BoardMemory {
        id: new_id(),
        board_id,
        is_chat: request.is_chat,
        content: request.content,
        tags: request.tags,
        source: request.source,
        created_at: Utc::now(),
    };
    state.store.append_memory(memory.clone());
    Ok(json!({ "memory": memory }))
}

pub async fn append_memory(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
    Json(request): Json<NewMemoryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(
        append_memory_impl(&state, &auth, board_id, request).await?,
    ))
}

/// `POST /agent/memory`.
pub async fn append_memory_own_board(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<NewMemoryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board_id = own_board_id(&auth)?;
    Ok(Json(
        append_memory_impl(&state, &auth, board_id, request).await?,
    ))
}

pub async fn list_approvals(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_list_board_scoped(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    let approvals = state.store.list_approvals_for_board(board_id);
    Ok(Json(json!({ "approvals": approvals })))
}

#[derive(Debug, Deserialize)]
pub struct NewApprovalRequest {
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub summary: String,
}

pub async fn create_approval(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
    Json(request): Json<NewApprovalRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_create_task(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    if request.summary.trim().is_empty() {
        return Err(ApiError::invalid_input("summary must not be blank"));
    }
    let approval = Approval {
        id: new_id(),
        board_id,
        task_id: request.task_id,
        status: ApprovalStatus::Pending,
        summary: request.summary,
        created_at: Utc::now(),
    };
    state.store.insert_approval(approval.clone());
    Ok(Json(json!({ "approval": approval })))
}

#[derive(Debug, Deserialize)]
pub struct PatchApprovalRequest {
    pub status: ApprovalStatus,
}

pub async fn patch_approval(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((board_id, approval_id)): Path<(BoardId, ApprovalId)>,
    Json(request): Json<PatchApprovalRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_create_task(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    let mut approval = state
        .store
        .get_approval(approval_id)
        .filter(|a| a.board_id == board_id)
        .ok_or(DomainError::NotFound)?;
    approval.status = request.status;
    state.store.update_approval(approval.clone());
    Ok(Json(json!({ "approval": approval })))
}

pub async fn get_onboarding(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let board = get_board_or_404(&state.store, board_id)?;
    authorization::can_list_board_scoped(
        &auth.actor,
        auth.member.as_ref(),
        auth.agent.as_ref(),
        &board,
    )?;
    let has_lead_agent = state.store.find_board_lead(board_id).is_some();
    let gateway_configured = board
        .gateway_id
        .and_then(|id| state.store.get_gateway(id))
        .is_some_and(|g| g.is_provisionable());
    Ok(Json(json!({
        "goal_confirmed": board.goal_confirmed,
        "objective": board.objective,
        "target_date": board.target_date,
        "has_lead_agent": has_lead_agent,
        "gateway_configured": gateway_configured,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmOnboardingRequest {
    pub objective: String,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
}

pub async fn confirm_onboarding(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(board_id): Path<BoardId>,
    Json(request): Json<ConfirmOnboardingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut board = get_board_or_404(&state.store, board_id)?;
    authorization::can_update_board_meta(&auth.actor, auth.member.as_ref(), &board)?;
    if request.objective.trim().is_empty() {
        return Err(ApiError::invalid_input("objective must not be blank"));
    }
    board.objective = Some(request.objective);
    board.target_date = request.target_date;
    board.goal_confirmed = true;
    state.store.update_board(board.clone());
    Ok(Json(json!({ "board": board })))
}
