//! Task lifecycle state machine (spec.md §4.4): the `inbox -> in_progress ->
//! review -> done` chain, the `any -> inbox` revert on unassignment, and the
//! dependency-block gate that applies to both status and assignment changes.

use chrono::{DateTime, Utc};

use boardctl_types::model::{AgentId, Task, TaskId, TaskStatus};
use boardctl_types::DomainError;

/// A requested change to a task's status and/or assignment. `None` means
/// "leave unchanged"; `Some(None)` for `assigned_agent_id` means "unassign".
#[derive(Debug, Clone, Default)]
pub struct TransitionRequest {
    pub new_status: Option<TaskStatus>,
    pub new_assigned_agent_id: Option<Option<AgentId>>,
}

/// Edges the diagram in spec.md §4.4 actually draws: the linear
/// forward chain, plus "any status -> inbox" for unassignment. Any other
/// pair (including skipping a step, or moving backward without
/// unassigning) is rejected as a state conflict.
fn is_allowed_status_edge(from: TaskStatus, to: TaskStatus) -> bool {
    if from == to {
        return true;
    }
    if to == TaskStatus::Inbox {
        return true;
    }
    matches!(
        (from, to),
        (TaskStatus::Inbox, TaskStatus::InProgress)
            | (TaskStatus::InProgress, TaskStatus::Review)
            | (TaskStatus::Review, TaskStatus::Done)
    )
}

fn stamp_status_timestamps(task: &mut Task, status: TaskStatus, at: DateTime<Utc>) {
    task.status = status;
    match status {
        TaskStatus::Inbox => {
            task.in_progress_at = None;
            task.review_at = None;
            task.done_at = None;
        }
        TaskStatus::InProgress => task.in_progress_at = Some(at),
        TaskStatus::Review => task.review_at = Some(at),
        TaskStatus::Done => task.done_at = Some(at),
    }
}

/// Applies `req` to `task`, given the task's current `blocked_by` set.
/// Returns the updated task or a `DomainError::TaskBlocked` /
/// `DomainError::Conflict` without mutating the input.
pub fn apply_transition(
    task: &Task,
    blocked_by: &[TaskId],
    req: &TransitionRequest,
    at: DateTime<Utc>,
) -> Result<Task, DomainError> {
    let mut next = task.clone();
    let is_blocked = !blocked_by.is_empty();

    if let Some(target_status) = req.new_status {
        if is_blocked && target_status != TaskStatus::Inbox {
            return Err(DomainError::TaskBlocked {
                blocked_by: blocked_by.to_vec(),
            });
        }
        if !is_allowed_status_edge(task.status, target_status) {
            return Err(DomainError::Conflict {
                reason: format!(
                    "cannot transition task from {} to {}",
                    task.status.as_str(),
                    target_status.as_str()
                ),
            });
        }
        stamp_status_timestamps(&mut next, target_status, at);
    }

    if let Some(new_assignment) = req.new_assigned_agent_id {
        if new_assignment.is_some() && is_blocked {
            return Err(DomainError::TaskBlocked {
                blocked_by: blocked_by.to_vec(),
            });
        }
        let was_assigned = next.assigned_agent_id.is_some();
        next.assigned_agent_id = new_assignment;
        if new_assignment.is_none() && was_assigned && req.new_status.is_none() {
            stamp_status_timestamps(&mut next, TaskStatus::Inbox, at);
        }
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardctl_types::model::TaskPriority;
    use uuid::Uuid;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            assigned_agent_id: Some(Uuid::new_v4()),
            created_at: Utc::now(),
            in_progress_at: None,
            review_at: None,
            done_at: None,
        }
    }

    #[test]
    fn blocked_task_cannot_leave_inbox() {
        let t = task(TaskStatus::Inbox);
        let blockers = vec![Uuid::new_v4()];
        let req = TransitionRequest {
            new_status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        let err = apply_transition(&t, &blockers, &req, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::TaskBlocked { .. }));
    }

    #[test]
    fn blocked_task_cannot_be_assigned() {
        let mut t = task(TaskStatus::Inbox);
        t.assigned_agent_id = None;
        let blockers = vec![Uuid::new_v4()];
        let req = TransitionRequest {
            new_assigned_agent_id: Some(Some(Uuid::new_v4())),
            ..Default::default()
        };
        let err = apply_transition(&t, &blockers, &req, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::TaskBlocked { .. }));
    }

    #[test]
    fn unblocking_then_forward_transition_succeeds() {
        let t = task(TaskStatus::Inbox);
        let req = TransitionRequest {
            new_status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        let updated = apply_transition(&t, &[], &req, Utc::now()).unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.in_progress_at.is_some());
    }

    #[test]
    fn skipping_a_step_is_rejected() {
        let t = task(TaskStatus::Inbox);
        let req = TransitionRequest {
            new_status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let err = apply_transition(&t, &[], &req, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[test]
    fn unassigning_reverts_any_status_to_inbox() {
        let t = task(TaskStatus::Review);
        let req = TransitionRequest {
            new_assigned_agent_id: Some(None),
            ..Default::default()
        };
        let updated = apply_transition(&t, &[], &req, Utc::now()).unwrap();
        assert_eq!(updated.status, TaskStatus::Inbox);
        assert!(updated.assigned_agent_id.is_none());
        assert!(updated.review_at.is_none());
    }
}
