use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::json::Json;

pub type OrgId = Uuid;
pub type MemberId = Uuid;
pub type GatewayId = Uuid;
pub type BoardId = Uuid;
pub type AgentId = Uuid;
pub type TaskId = Uuid;
pub type ActivityEventId = Uuid;
pub type BoardMemoryId = Uuid;
pub type ApprovalId = Uuid;
pub type WebhookId = Uuid;
pub type WebhookPayloadId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub org_id: OrgId,
    pub user_id: Uuid,
    pub role: MemberRole,
    /// Board ids this member has an explicit write grant on, beyond what
    /// `role == Admin` already implies (admins see/write every board).
    pub board_write_grants: Vec<BoardId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub id: GatewayId,
    pub org_id: OrgId,
    pub url: Option<String>,
    pub token: Option<String>,
    pub main_session_key: Option<String>,
    pub workspace_root: Option<String>,
}

impl Gateway {
    /// A gateway without these three fields cannot be used for provisioning
    /// (spec §3 invariant).
    pub fn is_provisionable(&self) -> bool {
        self.url.as_ref().is_some_and(|v| !v.trim().is_empty())
            && self
                .main_session_key
                .as_ref()
                .is_some_and(|v| !v.trim().is_empty())
            && self
                .workspace_root
                .as_ref()
                .is_some_and(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub org_id: OrgId,
    pub name: String,
    pub objective: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
    pub goal_confirmed: bool,
    pub gateway_id: Option<GatewayId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Provisioning,
    Online,
    Offline,
    Updating,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    pub every: String,
    pub target: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            every: "10m".to_string(),
            target: "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// `None` means this is the gateway's main agent, not scoped to a board.
    pub board_id: Option<BoardId>,
    pub name: String,
    pub is_board_lead: bool,
    pub openclaw_session_id: Option<String>,
    pub heartbeat_config: HeartbeatConfig,
    pub identity_profile: BTreeMap<String, Json>,
    pub identity_template: Option<String>,
    pub soul_template: Option<String>,
    pub agent_token_hash: Option<String>,
    /// Status stored at rest; derived effective status applies the 10-minute
    /// offline rule on top of `last_seen_at` (see `effective_status`).
    pub status: AgentStatus,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const OFFLINE_AFTER_MINUTES: i64 = 10;

impl Agent {
    /// Applies the derived-offline rule from spec §3: an agent recorded as
    /// `online` is reported `offline` once 10 minutes have elapsed since
    /// `last_seen_at`.
    pub fn effective_status(&self, at: DateTime<Utc>) -> AgentStatus {
        if self.status != AgentStatus::Online {
            return self.status;
        }
        match self.last_seen_at {
            Some(last_seen) if (at - last_seen).num_minutes() > OFFLINE_AFTER_MINUTES => {
                AgentStatus::Offline
            }
            Some(_) => AgentStatus::Online,
            None => AgentStatus::Offline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Inbox,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub board_id: BoardId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_agent_id: Option<AgentId>,
    pub created_at: DateTime<Utc>,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub review_at: Option<DateTime<Utc>>,
    pub done_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: TaskId,
    pub depends_on_task_id: TaskId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: ActivityEventId,
    pub org_id: OrgId,
    pub board_id: Option<BoardId>,
    pub event_type: String,
    pub task_id: Option<TaskId>,
    pub agent_id: Option<AgentId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// `task.comment` events with non-empty trimmed message make up the
    /// comment feed (spec §3).
    pub fn is_comment(&self) -> bool {
        self.event_type == "task.comment" && !self.message.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardMemory {
    pub id: BoardMemoryId,
    pub board_id: BoardId,
    pub is_chat: bool,
    pub content: String,
    pub tags: Vec<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub board_id: BoardId,
    pub task_id: Option<TaskId>,
    pub status: ApprovalStatus,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardWebhook {
    pub id: WebhookId,
    pub board_id: BoardId,
    pub description: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardWebhookPayload {
    pub id: WebhookPayloadId,
    pub board_id: BoardId,
    pub webhook_id: WebhookId,
    pub payload: Json,
    pub headers: BTreeMap<String, String>,
    pub source_ip: Option<String>,
    pub content_type: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_agent() -> Agent {
        Agent {
            id: Uuid::new_v4(),
            board_id: Some(Uuid::new_v4()),
            name: "Scout".to_string(),
            is_board_lead: false,
            openclaw_session_id: Some("agent:scout:main".to_string()),
            heartbeat_config: HeartbeatConfig::default(),
            identity_profile: BTreeMap::new(),
            identity_template: None,
            soul_template: None,
            agent_token_hash: None,
            status: AgentStatus::Online,
            last_seen_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_status_derives_offline_after_ten_minutes() {
        let mut agent = base_agent();
        let now = Utc::now();
        agent.last_seen_at = Some(now - Duration::minutes(11));
        assert_eq!(agent.effective_status(now), AgentStatus::Offline);

        agent.last_seen_at = Some(now - Duration::minutes(5));
        assert_eq!(agent.effective_status(now), AgentStatus::Online);
    }

    #[test]
    fn effective_status_ignores_non_online_statuses() {
        let mut agent = base_agent();
        agent.status = AgentStatus::Provisioning;
        agent.last_seen_at = None;
        assert_eq!(
            agent.effective_status(Utc::now()),
            AgentStatus::Provisioning
        );
    }

    #[test]
    fn gateway_provisionable_requires_all_three_fields() {
        let gateway = Gateway {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            url: Some("https://gw.example".to_string()),
            token: None,
            main_session_key: Some("main".to_string()),
            workspace_root: None,
        };
        assert!(!gateway.is_provisionable());
    }
}
