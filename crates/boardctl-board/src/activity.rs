//! `ActivityEvent` construction helpers. Events are always appended inside
//! the same critical section as the state change that produced them
//! (spec.md §4.6, §5) — callers build the event here, then pass it to
//! `Store::append_activity` before releasing the write guard.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use boardctl_types::model::{ActivityEvent, AgentId, BoardId, OrgId, TaskId};

pub fn build(
    org_id: OrgId,
    board_id: Option<BoardId>,
    event_type: impl Into<String>,
    task_id: Option<TaskId>,
    agent_id: Option<AgentId>,
    message: impl Into<String>,
    at: DateTime<Utc>,
) -> ActivityEvent {
    ActivityEvent {
        id: Uuid::new_v4(),
        org_id,
        board_id,
        event_type: event_type.into(),
        task_id,
        agent_id,
        message: message.into(),
        created_at: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_detection_requires_non_empty_trimmed_message() {
        let event = build(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            "task.comment",
            Some(Uuid::new_v4()),
            None,
            "  ",
            Utc::now(),
        );
        assert!(!event.is_comment());

        let event = build(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            "task.comment",
            Some(Uuid::new_v4()),
            None,
            "looks good",
            Utc::now(),
        );
        assert!(event.is_comment());
    }
}
