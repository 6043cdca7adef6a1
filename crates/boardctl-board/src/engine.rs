//! Ties the state machine, dependency closure, and authorization matrix to
//! the shared `Store`: the operations the REST layer actually calls. Every
//! function here runs inside the store's single critical section per
//! mutation, appending activity events in the same section that produced
//! them (spec.md §4.6, §5).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use boardctl_core::{ids::slugify, Store};
use boardctl_types::json::Json;
use boardctl_types::model::{
    Agent, AgentId, AgentStatus, BoardId, HeartbeatConfig, Member, Task, TaskDependency, TaskId,
    TaskPriority, TaskStatus,
};
use boardctl_types::policy::DependencyCleanupPolicy;
use boardctl_types::{ActorContext, DomainError};

use crate::{activity, authorization, dependency, state_machine};

fn board_tasks_by_id(store: &Store, board_id: BoardId) -> HashMap<TaskId, Task> {
    store
        .list_tasks_for_board(board_id)
        .into_iter()
        .map(|t| (t.id, t))
        .collect()
}

/// Recomputes `blocked_by` for a task fresh against current store state
/// (spec.md §4.4: not stored, recomputed on every mutation attempt).
pub fn blocked_by_for_task(store: &Store, task: &Task) -> Vec<TaskId> {
    let deps = store.dependencies_of(task.id);
    let tasks_by_id = board_tasks_by_id(store, task.board_id);
    dependency::blocked_by(&deps, &tasks_by_id)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assigned_agent_id: Option<AgentId>,
}

pub fn create_task(
    store: &Store,
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board_id: BoardId,
    new_task: NewTask,
    at: DateTime<Utc>,
) -> Result<Task, DomainError> {
    let board = store.get_board(board_id).ok_or(DomainError::NotFound)?;
    authorization::can_create_task(actor, member, acting_agent, &board)?;

    if new_task.title.trim().is_empty() {
        return Err(DomainError::InvalidInput {
            field: "title".to_string(),
        });
    }

    if let Some(target_id) = new_task.assigned_agent_id {
        let target = store.get_agent(target_id).ok_or(DomainError::NotFound)?;
        if target.board_id != Some(board_id) {
            return Err(DomainError::InvalidInput {
                field: "assigned_agent_id".to_string(),
            });
        }
        authorization::check_not_assigning_to_lead(&target)?;
    }

    let task = Task {
        id: Uuid::new_v4(),
        board_id,
        title: new_task.title.trim().to_string(),
        description: new_task.description,
        status: TaskStatus::Inbox,
        priority: new_task.priority,
        assigned_agent_id: new_task.assigned_agent_id,
        created_at: at,
        in_progress_at: None,
        review_at: None,
        done_at: None,
    };
    store.insert_task(task.clone());
    store.append_activity(activity::build(
        board.org_id,
        Some(board_id),
        "task.created",
        Some(task.id),
        actor.agent_id(),
        format!("Task \"{}\" created", task.title),
        at,
    ));
    if task.assigned_agent_id.is_some() {
        store.append_activity(activity::build(
            board.org_id,
            Some(board_id),
            "task.assigned",
            Some(task.id),
            actor.agent_id(),
            "Task assigned at creation".to_string(),
            at,
        ));
    }
    Ok(task)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assigned_agent_id: Option<Option<AgentId>>,
}

pub fn update_task(
    store: &Store,
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    task_id: TaskId,
    patch: TaskPatch,
    at: DateTime<Utc>,
) -> Result<Task, DomainError> {
    let task = store.get_task(task_id).ok_or(DomainError::NotFound)?;
    let board = store
        .get_board(task.board_id)
        .ok_or_else(|| DomainError::Invariant("task references a missing board".to_string()))?;

    authorization::can_update_task(actor, member, acting_agent, &board, task.assigned_agent_id)?;

    if let Some(Some(target_id)) = patch.assigned_agent_id {
        let target = store.get_agent(target_id).ok_or(DomainError::NotFound)?;
        if target.board_id != Some(task.board_id) {
            return Err(DomainError::InvalidInput {
                field: "assigned_agent_id".to_string(),
            });
        }
        authorization::check_not_assigning_to_lead(&target)?;

        let is_self_reassign = actor.agent_id() == Some(target_id);
        if !is_self_reassign {
            authorization::can_assign_to_others(actor, member, acting_agent, &board)?;
        }
    }

    let deps = store.dependencies_of(task_id);
    let tasks_by_id = board_tasks_by_id(store, task.board_id);
    let blocked = dependency::blocked_by(&deps, &tasks_by_id);

    let req = state_machine::TransitionRequest {
        new_status: patch.status,
        new_assigned_agent_id: patch.assigned_agent_id,
    };
    let mut next = state_machine::apply_transition(&task, &blocked, &req, at)?;

    if let Some(title) = patch.title {
        next.title = title;
    }
    if let Some(description) = patch.description {
        next.description = description;
    }
    if let Some(priority) = patch.priority {
        next.priority = priority;
    }

    store.update_task(next.clone());

    if task.status != next.status {
        store.append_activity(activity::build(
            board.org_id,
            Some(board.id),
            "task.status_changed",
            Some(task_id),
            actor.agent_id(),
            format!(
                "Status changed from {} to {}",
                task.status.as_str(),
                next.status.as_str()
            ),
            at,
        ));
    }
    if task.assigned_agent_id != next.assigned_agent_id {
        let (event_type, message) = match next.assigned_agent_id {
            Some(_) => ("task.assigned", "Task assigned".to_string()),
            None => ("task.unassigned", "Task unassigned".to_string()),
        };
        store.append_activity(activity::build(
            board.org_id,
            Some(board.id),
            event_type,
            Some(task_id),
            actor.agent_id(),
            message,
            at,
        ));
    }

    Ok(next)
}

pub fn delete_task(
    store: &Store,
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    task_id: TaskId,
    policy: DependencyCleanupPolicy,
    at: DateTime<Utc>,
) -> Result<(), DomainError> {
    let task = store.get_task(task_id).ok_or(DomainError::NotFound)?;
    let board = store
        .get_board(task.board_id)
        .ok_or_else(|| DomainError::Invariant("task references a missing board".to_string()))?;
    authorization::can_create_task(actor, member, acting_agent, &board)?;

    match policy {
        DependencyCleanupPolicy::CascadeNull => store.cascade_null_dependencies_on(task_id),
        DependencyCleanupPolicy::RejectIfReferenced => {
            if !store.dependents_of(task_id).is_empty() {
                return Err(DomainError::Conflict {
                    reason: "task has incoming dependency edges".to_string(),
                });
            }
        }
    }

    store.delete_task(task_id);
    store.append_activity(activity::build(
        board.org_id,
        Some(board.id),
        "task.deleted",
        None,
        actor.agent_id(),
        format!("Task \"{}\" deleted", task.title),
        at,
    ));
    Ok(())
}

pub fn create_dependency(
    store: &Store,
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board_id: BoardId,
    task_id: TaskId,
    depends_on_task_id: TaskId,
) -> Result<(), DomainError> {
    let board = store.get_board(board_id).ok_or(DomainError::NotFound)?;
    authorization::can_create_task(actor, member, acting_agent, &board)?;

    let task = store
        .get_task(task_id)
        .filter(|t| t.board_id == board_id)
        .ok_or(DomainError::NotFound)?;
    let _dependency_target = store
        .get_task(depends_on_task_id)
        .filter(|t| t.board_id == board_id)
        .ok_or(DomainError::NotFound)?;

    let edges: Vec<(TaskId, TaskId)> = store
        .all_dependencies_for_board(board_id)
        .into_iter()
        .map(|d| (d.task_id, d.depends_on_task_id))
        .collect();
    if dependency::would_cycle(task.id, depends_on_task_id, &edges) {
        return Err(DomainError::Conflict {
            reason: "dependency would create a cycle".to_string(),
        });
    }

    store.insert_dependency(TaskDependency {
        task_id,
        depends_on_task_id,
    });
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    #[serde(default)]
    pub is_board_lead: bool,
    #[serde(default)]
    pub heartbeat_config: HeartbeatConfig,
    #[serde(default)]
    pub identity_profile: BTreeMap<String, Json>,
    #[serde(default)]
    pub identity_template: Option<String>,
    #[serde(default)]
    pub soul_template: Option<String>,
}

pub fn create_agent(
    store: &Store,
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board_id: BoardId,
    new_agent: NewAgent,
    at: DateTime<Utc>,
) -> Result<Agent, DomainError> {
    let board = store.get_board(board_id).ok_or(DomainError::NotFound)?;
    authorization::can_create_agent(actor, member, acting_agent, &board)?;

    if new_agent.name.trim().is_empty() {
        return Err(DomainError::InvalidInput {
            field: "name".to_string(),
        });
    }
    if store.agent_name_taken(board_id, &new_agent.name, None) {
        return Err(DomainError::Conflict {
            reason: "agent name already used on this board".to_string(),
        });
    }
    if new_agent.is_board_lead && store.find_board_lead(board_id).is_some() {
        return Err(DomainError::Conflict {
            reason: "board already has a lead agent".to_string(),
        });
    }

    let slug = slugify(&new_agent.name);
    if let Some(gateway_id) = board.gateway_id {
        if store.workspace_slug_taken(gateway_id, &slug, None) {
            return Err(DomainError::Conflict {
                reason: "agent_workspace_slug_collision".to_string(),
            });
        }
    }

    let agent = Agent {
        id: Uuid::new_v4(),
        board_id: Some(board_id),
        name: new_agent.name.trim().to_string(),
        is_board_lead: new_agent.is_board_lead,
        openclaw_session_id: Some(format!("agent:{slug}:main")),
        heartbeat_config: new_agent.heartbeat_config,
        identity_profile: new_agent.identity_profile,
        identity_template: new_agent.identity_template,
        soul_template: new_agent.soul_template,
        agent_token_hash: None,
        status: AgentStatus::Provisioning,
        last_seen_at: None,
        created_at: at,
        updated_at: at,
    };
    store.insert_agent(agent.clone());
    store.append_activity(activity::build(
        board.org_id,
        Some(board_id),
        "agent.created",
        None,
        Some(agent.id),
        format!("Agent \"{}\" created", agent.name),
        at,
    ));
    Ok(agent)
}

/// Removes an agent and nulls every weak reference to it (spec.md §3
/// ownership: agents hold only weak references to assigned tasks). Gateway
/// cleanup (removing the agent from the remote registry) is the caller's
/// responsibility, performed best-effort after this returns — deletion of
/// the durable record must not block on it (spec.md §9).
pub fn delete_agent(
    store: &Store,
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    agent_id: AgentId,
    at: DateTime<Utc>,
) -> Result<Agent, DomainError> {
    let agent = store.get_agent(agent_id).ok_or(DomainError::NotFound)?;
    let board_id = agent
        .board_id
        .ok_or_else(|| DomainError::AuthorizationDenied {
            reason: "the gateway main agent cannot be deleted through the board API".to_string(),
        })?;
    let board = store
        .get_board(board_id)
        .ok_or_else(|| DomainError::Invariant("agent references a missing board".to_string()))?;
    authorization::can_create_agent(actor, member, acting_agent, &board)?;

    for task_id in store.unassign_tasks_for_agent(agent_id) {
        store.append_activity(activity::build(
            board.org_id,
            Some(board_id),
            "task.unassigned",
            Some(task_id),
            None,
            "Task unassigned: agent deleted".to_string(),
            at,
        ));
    }
    store.null_activity_agent(agent_id);
    store.delete_agent(agent_id);
    store.append_activity(activity::build(
        board.org_id,
        Some(board_id),
        "agent.deleted",
        None,
        None,
        format!("Agent \"{}\" deleted", agent.name),
        at,
    ));
    Ok(agent)
}

/// Applies a heartbeat: creates the agent record on first contact if the
/// caller has already authorized that (spec.md §6.1), otherwise just
/// refreshes `last_seen_at`/`status`.
pub fn record_heartbeat(
    store: &Store,
    agent_id: AgentId,
    at: DateTime<Utc>,
) -> Result<Agent, DomainError> {
    let mut agent = store.get_agent(agent_id).ok_or(DomainError::NotFound)?;
    agent.last_seen_at = Some(at);
    agent.status = AgentStatus::Online;
    agent.updated_at = at;
    store.update_agent(agent.clone());
    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardctl_types::model::{Board, MemberRole, OrgId};

    fn make_board(store: &Store, org: OrgId) -> Board {
        let board = Board {
            id: Uuid::new_v4(),
            org_id: org,
            name: "Launch".to_string(),
            objective: None,
            target_date: None,
            goal_confirmed: false,
            gateway_id: None,
            created_at: Utc::now(),
        };
        store.insert_board(board.clone());
        board
    }

    fn lead_actor(board: &Board, store: &Store) -> (ActorContext, Agent) {
        let lead = Agent {
            id: Uuid::new_v4(),
            board_id: Some(board.id),
            name: "Lead".to_string(),
            is_board_lead: true,
            openclaw_session_id: Some("agent:lead:main".to_string()),
            heartbeat_config: HeartbeatConfig::default(),
            identity_profile: BTreeMap::new(),
            identity_template: None,
            soul_template: None,
            agent_token_hash: None,
            status: AgentStatus::Online,
            last_seen_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert_agent(lead.clone());
        (
            ActorContext::Agent {
                agent_id: lead.id,
                is_board_lead: true,
            },
            lead,
        )
    }

    #[test]
    fn blocked_transition_then_unblocked_end_to_end() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let board = make_board(&store, org);
        let (actor, lead) = lead_actor(&board, &store);

        let dep = create_task(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewTask {
                title: "D".to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assigned_agent_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let t = create_task(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewTask {
                title: "T".to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assigned_agent_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        create_dependency(&store, &actor, None, Some(&lead), board.id, t.id, dep.id).unwrap();

        let err = update_task(
            &store,
            &actor,
            None,
            Some(&lead),
            t.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::TaskBlocked { .. }));

        update_task(
            &store,
            &actor,
            None,
            Some(&lead),
            dep.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        update_task(
            &store,
            &actor,
            None,
            Some(&lead),
            dep.id,
            TaskPatch {
                status: Some(TaskStatus::Review),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        update_task(
            &store,
            &actor,
            None,
            Some(&lead),
            dep.id,
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let updated = update_task(
            &store,
            &actor,
            None,
            Some(&lead),
            t.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
    }

    #[test]
    fn creating_task_assigned_to_lead_is_rejected() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let board = make_board(&store, org);
        let (actor, lead) = lead_actor(&board, &store);

        let err = create_task(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewTask {
                title: "T".to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assigned_agent_id: Some(lead.id),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::AuthorizationDenied { .. }));
    }

    #[test]
    fn deleting_agent_assigned_to_in_progress_task_resets_it_to_inbox() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let board = make_board(&store, org);
        let (actor, lead) = lead_actor(&board, &store);

        let worker = create_agent(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewAgent {
                name: "Worker".to_string(),
                is_board_lead: false,
                heartbeat_config: HeartbeatConfig::default(),
                identity_profile: BTreeMap::new(),
                identity_template: None,
                soul_template: None,
            },
            Utc::now(),
        )
        .unwrap();

        let t = create_task(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewTask {
                title: "T".to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assigned_agent_id: Some(worker.id),
            },
            Utc::now(),
        )
        .unwrap();
        update_task(
            &store,
            &actor,
            None,
            Some(&lead),
            t.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        delete_agent(&store, &actor, None, Some(&lead), worker.id, Utc::now()).unwrap();

        let reloaded = store.get_task(t.id).unwrap();
        assert_eq!(reloaded.status, TaskStatus::Inbox);
        assert!(reloaded.assigned_agent_id.is_none());
    }

    #[test]
    fn duplicate_agent_name_on_same_board_is_rejected() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let board = make_board(&store, org);
        let (actor, lead) = lead_actor(&board, &store);

        create_agent(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewAgent {
                name: "Scout".to_string(),
                is_board_lead: false,
                heartbeat_config: HeartbeatConfig::default(),
                identity_profile: BTreeMap::new(),
                identity_template: None,
                soul_template: None,
            },
            Utc::now(),
        )
        .unwrap();

        let err = create_agent(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewAgent {
                name: "scout".to_string(),
                is_board_lead: false,
                heartbeat_config: HeartbeatConfig::default(),
                identity_profile: BTreeMap::new(),
                identity_template: None,
                soul_template: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn cyclic_dependency_is_rejected() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let board = make_board(&store, org);
        let (actor, lead) = lead_actor(&board, &store);

        let a = create_task(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewTask {
                title: "A".to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assigned_agent_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let b = create_task(
            &store,
            &actor,
            None,
            Some(&lead),
            board.id,
            NewTask {
                title: "B".to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assigned_agent_id: None,
            },
            Utc::now(),
        )
        .unwrap();

        create_dependency(&store, &actor, None, Some(&lead), board.id, b.id, a.id).unwrap();
        let err =
            create_dependency(&store, &actor, None, Some(&lead), board.id, a.id, b.id).unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn admin_member_can_create_and_assign_tasks() {
        let store = Store::new();
        let org = Uuid::new_v4();
        let board = make_board(&store, org);
        let member = Member {
            id: Uuid::new_v4(),
            org_id: org,
            user_id: Uuid::new_v4(),
            role: MemberRole::Admin,
            board_write_grants: vec![],
        };
        let actor = ActorContext::User {
            member_id: member.id,
        };

        let worker = create_agent(
            &store,
            &actor,
            Some(&member),
            None,
            board.id,
            NewAgent {
                name: "Worker".to_string(),
                is_board_lead: false,
                heartbeat_config: HeartbeatConfig::default(),
                identity_profile: BTreeMap::new(),
                identity_template: None,
                soul_template: None,
            },
            Utc::now(),
        )
        .unwrap();

        let task = create_task(
            &store,
            &actor,
            Some(&member),
            None,
            board.id,
            NewTask {
                title: "T".to_string(),
                description: None,
                priority: TaskPriority::High,
                assigned_agent_id: Some(worker.id),
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(task.assigned_agent_id, Some(worker.id));
    }
}
