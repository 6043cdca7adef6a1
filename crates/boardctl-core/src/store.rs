//! In-process store standing in for the externally-owned relational schema
//! (spec.md §6.3, §1 Non-goals: persistence schema migrations are out of
//! scope). Guarded by a single `RwLock` per spec.md §5: every mutation
//! happens inside one critical section, matching "the same transaction as
//! the state change that produced it" — activity-event append never
//! happens outside the critical section that produced it. Callers must
//! never hold a guard across an `.await` on gateway I/O.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use boardctl_types::model::{
    ActivityEvent, Agent, AgentId, Approval, ApprovalId, Board, BoardId, BoardMemory, BoardWebhook,
    BoardWebhookPayload, Gateway, GatewayId, Member, MemberId, OrgId, Organization, Task,
    TaskDependency, TaskId, WebhookId, WebhookPayloadId,
};

#[derive(Debug, Default)]
struct Tables {
    organizations: HashMap<OrgId, Organization>,
    members: HashMap<MemberId, Member>,
    gateways: HashMap<GatewayId, Gateway>,
    boards: HashMap<BoardId, Board>,
    agents: HashMap<AgentId, Agent>,
    tasks: HashMap<TaskId, Task>,
    dependencies: Vec<TaskDependency>,
    activity: Vec<ActivityEvent>,
    memory: Vec<BoardMemory>,
    approvals: HashMap<ApprovalId, Approval>,
    webhooks: HashMap<WebhookId, BoardWebhook>,
    webhook_payloads: HashMap<WebhookPayloadId, BoardWebhookPayload>,
}

#[derive(Debug, Default)]
pub struct Store {
    inner: RwLock<Tables>,
}

/// Recovers from lock poisoning rather than propagating the panic: one
/// handler panicking with a guard held should not wedge every other
/// request against this store.
fn read(lock: &RwLock<Tables>) -> RwLockReadGuard<'_, Tables> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(lock: &RwLock<Tables>) -> RwLockWriteGuard<'_, Tables> {
    lock.write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // -- organizations -----------------------------------------------------

    pub fn insert_organization(&self, org: Organization) {
        write(&self.inner).organizations.insert(org.id, org);
    }

    pub fn get_organization(&self, id: OrgId) -> Option<Organization> {
        read(&self.inner).organizations.get(&id).cloned()
    }

    // -- members -------------------------------------------------------------

    pub fn insert_member(&self, member: Member) {
        write(&self.inner).members.insert(member.id, member);
    }

    pub fn get_member(&self, id: MemberId) -> Option<Member> {
        read(&self.inner).members.get(&id).cloned()
    }

    // -- gateways ------------------------------------------------------------

    pub fn insert_gateway(&self, gateway: Gateway) {
        write(&self.inner).gateways.insert(gateway.id, gateway);
    }

    pub fn get_gateway(&self, id: GatewayId) -> Option<Gateway> {
        read(&self.inner).gateways.get(&id).cloned()
    }

    pub fn update_gateway(&self, gateway: Gateway) {
        write(&self.inner).gateways.insert(gateway.id, gateway);
    }

    pub fn list_gateways_for_org(&self, org_id: OrgId) -> Vec<Gateway> {
        read(&self.inner)
            .gateways
            .values()
            .filter(|g| g.org_id == org_id)
            .cloned()
            .collect()
    }

    // -- boards ---------------------------------------------------------------

    pub fn insert_board(&self, board: Board) {
        write(&self.inner).boards.insert(board.id, board);
    }

    pub fn get_board(&self, id: BoardId) -> Option<Board> {
        read(&self.inner).boards.get(&id).cloned()
    }

    pub fn update_board(&self, board: Board) {
        write(&self.inner).boards.insert(board.id, board);
    }

    pub fn list_boards_for_org(&self, org_id: OrgId) -> Vec<Board> {
        let mut boards: Vec<Board> = read(&self.inner)
            .boards
            .values()
            .filter(|b| b.org_id == org_id)
            .cloned()
            .collect();
        boards.sort_by_key(|b| b.created_at);
        boards
    }

    pub fn list_boards_for_gateway(&self, gateway_id: GatewayId) -> Vec<Board> {
        let mut boards: Vec<Board> = read(&self.inner)
            .boards
            .values()
            .filter(|b| b.gateway_id == Some(gateway_id))
            .cloned()
            .collect();
        boards.sort_by_key(|b| b.created_at);
        boards
    }

    // -- agents ---------------------------------------------------------------

    /// `(board_id, lower(name))` uniqueness per spec.md §6.3.
    pub fn agent_name_taken(
        &self,
        board_id: BoardId,
        name: &str,
        exclude: Option<AgentId>,
    ) -> bool {
        let lowered = name.to_lowercase();
        read(&self.inner).agents.values().any(|a| {
            a.board_id == Some(board_id)
                && a.name.to_lowercase() == lowered
                && Some(a.id) != exclude
        })
    }

    /// Detects a workspace-path slug collision between two agents sharing a
    /// gateway (spec.md §9 third Open Question, resolved in SPEC_FULL §4.4:
    /// reject rather than silently overwrite).
    pub fn workspace_slug_taken(
        &self,
        gateway_id: GatewayId,
        slug: &str,
        exclude: Option<AgentId>,
    ) -> bool {
        let tables = read(&self.inner);
        tables.agents.values().any(|a| {
            if Some(a.id) == exclude {
                return false;
            }
            let Some(board_id) = a.board_id else {
                return false;
            };
            let Some(board) = tables.boards.get(&board_id) else {
                return false;
            };
            if board.gateway_id != Some(gateway_id) {
                return false;
            }
            let key = a
                .openclaw_session_id
                .clone()
                .unwrap_or_else(|| format!("agent:{}:main", crate::ids::slugify(&a.name)));
            crate::ids::slugify(&key) == slug
        })
    }

    pub fn insert_agent(&self, agent: Agent) {
        write(&self.inner).agents.insert(agent.id, agent);
    }

    pub fn get_agent(&self, id: AgentId) -> Option<Agent> {
        read(&self.inner).agents.get(&id).cloned()
    }

    pub fn update_agent(&self, agent: Agent) {
        write(&self.inner).agents.insert(agent.id, agent);
    }

    pub fn delete_agent(&self, id: AgentId) -> Option<Agent> {
        write(&self.inner).agents.remove(&id)
    }

    pub fn list_agents_for_board(&self, board_id: BoardId) -> Vec<Agent> {
        let mut agents: Vec<Agent> = read(&self.inner)
            .agents
            .values()
            .filter(|a| a.board_id == Some(board_id))
            .cloned()
            .collect();
        agents.sort_by_key(|a| a.created_at);
        agents
    }

    pub fn find_board_lead(&self, board_id: BoardId) -> Option<Agent> {
        read(&self.inner)
            .agents
            .values()
            .find(|a| a.board_id == Some(board_id) && a.is_board_lead)
            .cloned()
    }

    pub fn find_agent_by_session_key(&self, key: &str) -> Option<Agent> {
        read(&self.inner)
            .agents
            .values()
            .find(|a| a.openclaw_session_id.as_deref() == Some(key))
            .cloned()
    }

    /// Resolves an agent-token bearer credential (spec.md §6.1: "agent
    /// token, hashed, unique per agent") to its owning agent.
    pub fn find_agent_by_token_hash(&self, hash: &str) -> Option<Agent> {
        read(&self.inner)
            .agents
            .values()
            .find(|a| a.agent_token_hash.as_deref() == Some(hash))
            .cloned()
    }

    // -- tasks ------------------------------------------------------------------

    pub fn insert_task(&self, task: Task) {
        write(&self.inner).tasks.insert(task.id, task);
    }

    pub fn get_task(&self, id: TaskId) -> Option<Task> {
        read(&self.inner).tasks.get(&id).cloned()
    }

    pub fn update_task(&self, task: Task) {
        write(&self.inner).tasks.insert(task.id, task);
    }

    /// Deletes the task and its own outgoing dependency edges. Incoming
    /// edges (other tasks depending on this one) are left for the caller to
    /// resolve per `DependencyCleanupPolicy` via `cascade_null_dependencies_on`.
    pub fn delete_task(&self, id: TaskId) -> Option<Task> {
        let mut tables = write(&self.inner);
        tables.dependencies.retain(|d| d.task_id != id);
        tables.tasks.remove(&id)
    }

    pub fn list_tasks_for_board(&self, board_id: BoardId) -> Vec<Task> {
        let mut tasks: Vec<Task> = read(&self.inner)
            .tasks
            .values()
            .filter(|t| t.board_id == board_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Unassigns every task currently held by `agent_id` (agent deletion,
    /// spec.md §3 lifecycle). Returns the affected task ids so the caller
    /// can append activity events for each inside the same critical section.
    pub fn unassign_tasks_for_agent(&self, agent_id: AgentId) -> Vec<TaskId> {
        let mut tables = write(&self.inner);
        let mut affected = Vec::new();
        for task in tables.tasks.values_mut() {
            if task.assigned_agent_id == Some(agent_id) {
                task.assigned_agent_id = None;
                if task.status == boardctl_types::model::TaskStatus::InProgress {
                    task.status = boardctl_types::model::TaskStatus::Inbox;
                    task.in_progress_at = None;
                }
                affected.push(task.id);
            }
        }
        affected
    }

    // -- task dependencies --------------------------------------------------------

    pub fn insert_dependency(&self, dependency: TaskDependency) {
        write(&self.inner).dependencies.push(dependency);
    }

    /// Ids this task depends on.
    pub fn dependencies_of(&self, task_id: TaskId) -> Vec<TaskId> {
        read(&self.inner)
            .dependencies
            .iter()
            .filter(|d| d.task_id == task_id)
            .map(|d| d.depends_on_task_id)
            .collect()
    }

    /// Ids that depend on this task.
    pub fn dependents_of(&self, task_id: TaskId) -> Vec<TaskId> {
        read(&self.inner)
            .dependencies
            .iter()
            .filter(|d| d.depends_on_task_id == task_id)
            .map(|d| d.task_id)
            .collect()
    }

    pub fn all_dependencies_for_board(&self, board_id: BoardId) -> Vec<TaskDependency> {
        let tables = read(&self.inner);
        let board_task_ids: std::collections::HashSet<TaskId> = tables
            .tasks
            .values()
            .filter(|t| t.board_id == board_id)
            .map(|t| t.id)
            .collect();
        tables
            .dependencies
            .iter()
            .filter(|d| board_task_ids.contains(&d.task_id))
            .copied()
            .collect()
    }

    /// Removes edges pointing *at* `task_id` (an incoming-edge cascade-null,
    /// spec.md §9 Open Question resolved as `CascadeNull`).
    pub fn cascade_null_dependencies_on(&self, task_id: TaskId) {
        write(&self.inner)
            .dependencies
            .retain(|d| d.depends_on_task_id != task_id);
    }

    // -- activity -----------------------------------------------------------------

    pub fn append_activity(&self, event: ActivityEvent) {
        write(&self.inner).activity.push(event);
    }

    pub fn list_activity_since(
        &self,
        board_ids: &[BoardId],
        since: DateTime<Utc>,
    ) -> Vec<ActivityEvent> {
        let mut events: Vec<ActivityEvent> = read(&self.inner)
            .activity
            .iter()
            .filter(|e| {
                e.created_at >= since && e.board_id.map(|b| board_ids.contains(&b)).unwrap_or(false)
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        events
    }

    /// Filtered scan standing in for the partial index on
    /// `event_type = 'task.comment'` (spec.md §6.3).
    pub fn list_comments_since(
        &self,
        board_ids: &[BoardId],
        since: DateTime<Utc>,
    ) -> Vec<ActivityEvent> {
        self.list_activity_since(board_ids, since)
            .into_iter()
            .filter(ActivityEvent::is_comment)
            .collect()
    }

    pub fn list_comments_for_board(&self, board_id: BoardId) -> Vec<ActivityEvent> {
        let mut events: Vec<ActivityEvent> = read(&self.inner)
            .activity
            .iter()
            .filter(|e| e.board_id == Some(board_id) && e.is_comment())
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        events
    }

    pub fn has_dispatch_success(&self, payload_id: WebhookPayloadId) -> bool {
        read(&self.inner).activity.iter().any(|e| {
            e.event_type == "webhook.dispatch.success"
                && e.message.contains(&payload_id.to_string())
        })
    }

    pub fn null_activity_agent(&self, agent_id: AgentId) {
        write(&self.inner)
            .activity
            .iter_mut()
            .filter(|e| e.agent_id == Some(agent_id))
            .for_each(|e| e.agent_id = None);
    }

    // -- board memory -------------------------------------------------------------

    pub fn append_memory(&self, memory: BoardMemory) {
        write(&self.inner).memory.push(memory);
    }

    /// Ordering matches the `(board_id, is_chat, created_at)` index named in
    /// spec.md §6.3.
    pub fn list_memory_for_board(
        &self,
        board_id: BoardId,
        is_chat: Option<bool>,
    ) -> Vec<BoardMemory> {
        let mut rows: Vec<BoardMemory> = read(&self.inner)
            .memory
            .iter()
            .filter(|m| m.board_id == board_id && is_chat.map(|c| m.is_chat == c).unwrap_or(true))
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        rows
    }

    pub fn latest_chat_memory(&self, board_id: BoardId) -> Option<BoardMemory> {
        read(&self.inner)
            .memory
            .iter()
            .filter(|m| m.board_id == board_id && m.is_chat)
            .max_by_key(|m| m.created_at)
            .cloned()
    }

    // -- approvals ------------------------------------------------------------------

    pub fn insert_approval(&self, approval: Approval) {
        write(&self.inner).approvals.insert(approval.id, approval);
    }

    pub fn get_approval(&self, id: ApprovalId) -> Option<Approval> {
        read(&self.inner).approvals.get(&id).cloned()
    }

    pub fn update_approval(&self, approval: Approval) {
        write(&self.inner).approvals.insert(approval.id, approval);
    }

    pub fn list_approvals_for_board(&self, board_id: BoardId) -> Vec<Approval> {
        let mut rows: Vec<Approval> = read(&self.inner)
            .approvals
            .values()
            .filter(|a| a.board_id == board_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        rows
    }

    // -- webhooks -------------------------------------------------------------------

    pub fn insert_webhook(&self, webhook: BoardWebhook) {
        write(&self.inner).webhooks.insert(webhook.id, webhook);
    }

    pub fn get_webhook(&self, id: WebhookId) -> Option<BoardWebhook> {
        read(&self.inner).webhooks.get(&id).cloned()
    }

    pub fn update_webhook(&self, webhook: BoardWebhook) {
        write(&self.inner).webhooks.insert(webhook.id, webhook);
    }

    pub fn delete_webhook(&self, id: WebhookId) -> Option<BoardWebhook> {
        write(&self.inner).webhooks.remove(&id)
    }

    pub fn list_webhooks_for_board(&self, board_id: BoardId) -> Vec<BoardWebhook> {
        let mut rows: Vec<BoardWebhook> = read(&self.inner)
            .webhooks
            .values()
            .filter(|w| w.board_id == board_id)
            .cloned()
            .collect();
        rows.sort_by_key(|w| w.created_at);
        rows
    }

    // -- webhook payloads -------------------------------------------------------------

    pub fn insert_webhook_payload(&self, payload: BoardWebhookPayload) {
        write(&self.inner)
            .webhook_payloads
            .insert(payload.id, payload);
    }

    pub fn get_webhook_payload(&self, id: WebhookPayloadId) -> Option<BoardWebhookPayload> {
        read(&self.inner).webhook_payloads.get(&id).cloned()
    }

    pub fn list_payloads_for_webhook(&self, webhook_id: WebhookId) -> Vec<BoardWebhookPayload> {
        let mut rows: Vec<BoardWebhookPayload> = read(&self.inner)
            .webhook_payloads
            .values()
            .filter(|p| p.webhook_id == webhook_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.received_at);
        rows
    }

    /// Reconciliation sweep input (SPEC_FULL §2/§4.7): payloads older than
    /// `threshold` with no matching `webhook.dispatch.success` event.
    pub fn list_undelivered_payloads_older_than(
        &self,
        threshold: DateTime<Utc>,
    ) -> Vec<BoardWebhookPayload> {
        let tables = read(&self.inner);
        tables
            .webhook_payloads
            .values()
            .filter(|p| p.received_at <= threshold)
            .filter(|p| {
                !tables.activity.iter().any(|e| {
                    e.event_type == "webhook.dispatch.success"
                        && e.message.contains(&p.id.to_string())
                })
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardctl_types::model::{AgentStatus, HeartbeatConfig, TaskPriority, TaskStatus};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn board(org: OrgId) -> Board {
        Board {
            id: Uuid::new_v4(),
            org_id: org,
            name: "Launch".to_string(),
            objective: None,
            target_date: None,
            goal_confirmed: false,
            gateway_id: None,
            created_at: Utc::now(),
        }
    }

    fn agent(board_id: BoardId, name: &str) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            board_id: Some(board_id),
            name: name.to_string(),
            is_board_lead: false,
            openclaw_session_id: None,
            heartbeat_config: HeartbeatConfig::default(),
            identity_profile: BTreeMap::new(),
            identity_template: None,
            soul_template: None,
            agent_token_hash: None,
            status: AgentStatus::Provisioning,
            last_seen_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task(board_id: BoardId) -> Task {
        Task {
            id: Uuid::new_v4(),
            board_id,
            title: "Do thing".to_string(),
            description: None,
            status: TaskStatus::Inbox,
            priority: TaskPriority::Medium,
            assigned_agent_id: None,
            created_at: Utc::now(),
            in_progress_at: None,
            review_at: None,
            done_at: None,
        }
    }

    #[test]
    fn agent_name_uniqueness_is_case_insensitive_and_per_board() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let b1 = board(org);
        let b2 = board(org);
        let scout = agent(b1.id, "Scout");
        store.insert_agent(scout.clone());

        assert!(store.agent_name_taken(b1.id, "scout", None));
        assert!(!store.agent_name_taken(b1.id, "scout", Some(scout.id)));
        assert!(!store.agent_name_taken(b2.id, "scout", None));
    }

    #[test]
    fn deleting_a_task_cascade_nulls_incoming_dependency_edges() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let b = board(org);
        let dep = task(b.id);
        let dependent = task(b.id);
        store.insert_task(dep.clone());
        store.insert_task(dependent.clone());
        store.insert_dependency(TaskDependency {
            task_id: dependent.id,
            depends_on_task_id: dep.id,
        });

        assert_eq!(store.dependencies_of(dependent.id), vec![dep.id]);
        store.cascade_null_dependencies_on(dep.id);
        assert!(store.dependencies_of(dependent.id).is_empty());
    }

    #[test]
    fn deleting_agent_unassigns_in_progress_task_back_to_inbox() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let b = board(org);
        let a = agent(b.id, "Scout");
        let mut t = task(b.id);
        t.status = TaskStatus::InProgress;
        t.assigned_agent_id = Some(a.id);
        t.in_progress_at = Some(Utc::now());
        store.insert_agent(a.clone());
        store.insert_task(t.clone());

        let affected = store.unassign_tasks_for_agent(a.id);
        assert_eq!(affected, vec![t.id]);
        let reloaded = store.get_task(t.id).unwrap();
        assert_eq!(reloaded.status, TaskStatus::Inbox);
        assert!(reloaded.assigned_agent_id.is_none());
        assert!(reloaded.in_progress_at.is_none());
    }
}
