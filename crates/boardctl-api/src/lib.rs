//! Axum REST/SSE surface for the control plane (spec.md §6).

pub mod auth;
pub mod error;
pub mod gateway_access;
pub mod handlers;
pub mod scope;
pub mod sse;
pub mod state;

pub use auth::Authenticated;
pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

use handlers::{activity, agents, boards, gateways, webhooks};

/// Builds the full router: `/api/v1` for member/agent-token callers, plus
/// the open webhook ingest path which carries no bearer auth of its own
/// (spec.md §6.1, §4.7 step 1).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/activity", get(activity::list_activity))
        .route(
            "/api/v1/activity/task-comments",
            get(activity::list_task_comments),
        )
        .route(
            "/api/v1/activity/task-comments/stream",
            get(activity::stream_task_comments),
        )
        .route("/api/v1/agents", get(agents::list_agents))
        .route("/api/v1/agents/stream", get(agents::stream_agents))
        .route("/api/v1/agents/heartbeat", post(agents::heartbeat))
        .route(
            "/api/v1/agents/{id}",
            axum::routing::patch(agents::patch_agent).delete(agents::delete_agent_handler),
        )
        .route(
            "/api/v1/boards",
            get(boards::list_boards).post(boards::create_board),
        )
        .route(
            "/api/v1/boards/{id}/agents",
            post(agents::create_agent_handler),
        )
        .route(
            "/api/v1/boards/{id}/tasks",
            get(boards::list_tasks).post(boards::create_task_handler),
        )
        .route(
            "/api/v1/boards/{id}/tasks/{task_id}",
            axum::routing::patch(boards::patch_task).delete(boards::delete_task_handler),
        )
        .route(
            "/api/v1/boards/{id}/tasks/{task_id}/dependencies",
            post(boards::create_dependency_handler),
        )
        .route(
            "/api/v1/boards/{id}/memory",
            get(boards::list_memory).post(boards::append_memory),
        )
        .route(
            "/api/v1/boards/{id}/approvals",
            get(boards::list_approvals).post(boards::create_approval),
        )
        .route(
            "/api/v1/boards/{id}/approvals/{approval_id}",
            axum::routing::patch(boards::patch_approval),
        )
        .route(
            "/api/v1/boards/{id}/onboarding",
            get(boards::get_onboarding).post(boards::confirm_onboarding),
        )
        .route(
            "/api/v1/boards/{id}/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/api/v1/boards/{id}/webhooks/{webhook_id}",
            axum::routing::delete(webhooks::delete_webhook).post(webhooks::receive_webhook),
        )
        .route(
            "/api/v1/boards/{id}/webhooks/{webhook_id}/payloads",
            get(webhooks::list_payloads),
        )
        .route("/api/v1/gateways/status", get(gateways::status))
        .route("/api/v1/gateways/sessions", get(gateways::list_sessions))
        .route(
            "/api/v1/gateways/sessions/{key}/history",
            get(gateways::session_history),
        )
        .route(
            "/api/v1/gateways/sessions/{key}/message",
            post(gateways::send_session_message),
        )
        .route("/api/v1/gateways/commands", get(gateways::list_commands))
        // Agent-scoped mirror surface (spec.md §6.1): the same board-scoped
        // reads/writes, addressed without a board id in the path because an
        // agent token already resolves to exactly one board.
        .route("/agent/tasks", get(boards::list_tasks_for_own_board))
        .route(
            "/agent/tasks/{task_id}",
            axum::routing::patch(boards::patch_own_task),
        )
        .route(
            "/agent/memory",
            get(boards::list_memory_for_own_board).post(boards::append_memory_own_board),
        )
        .route("/agent/heartbeat", post(agents::heartbeat))
        .with_state(state)
}
