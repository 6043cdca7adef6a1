//! Actor × action authorization matrix (spec.md §4.4). Every function
//! pattern-matches both `ActorContext` arms exhaustively (spec.md §9
//! redesign guidance for the polymorphic actor).

use boardctl_types::model::{Agent, Board, Member, MemberRole};
use boardctl_types::{ActorContext, DomainError};

fn denied(reason: &str) -> DomainError {
    DomainError::AuthorizationDenied {
        reason: reason.to_string(),
    }
}

/// Members read every board in their own organization; there is no
/// separate per-board read grant list in the data model (spec.md §3 names
/// only `board_write_grants`), so org membership alone gates read access.
pub fn member_can_read(member: &Member, board: &Board) -> bool {
    member.org_id == board.org_id
}

pub fn member_can_write(member: &Member, board: &Board) -> bool {
    member.org_id == board.org_id
        && (member.role == MemberRole::Admin || member.board_write_grants.contains(&board.id))
}

/// List tasks/agents/approvals (spec.md §4.4 matrix row 1): any member can
/// read their org's boards; any agent can read its own board.
pub fn can_list_board_scoped(
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board: &Board,
) -> Result<(), DomainError> {
    match actor {
        ActorContext::User { .. } => {
            let member = member.ok_or_else(|| denied("no membership record"))?;
            if member_can_read(member, board) {
                Ok(())
            } else {
                Err(denied("board not in this organization"))
            }
        }
        ActorContext::Agent { .. } => {
            let agent = acting_agent.ok_or_else(|| denied("unknown agent"))?;
            if agent.board_id == Some(board.id) {
                Ok(())
            } else {
                Err(denied("agent may only read its own board"))
            }
        }
    }
}

/// Create task (row 2): a human with board write, or the board's lead
/// agent. A non-lead agent may never create tasks.
pub fn can_create_task(
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board: &Board,
) -> Result<(), DomainError> {
    match actor {
        ActorContext::User { .. } => {
            let member = member.ok_or_else(|| denied("no membership record"))?;
            if member_can_write(member, board) {
                Ok(())
            } else {
                Err(denied("board write access required"))
            }
        }
        ActorContext::Agent {
            is_board_lead: true,
            ..
        } => {
            let agent = acting_agent.ok_or_else(|| denied("unknown agent"))?;
            if agent.board_id == Some(board.id) {
                Ok(())
            } else {
                Err(denied("lead agent may only act on its own board"))
            }
        }
        ActorContext::Agent {
            is_board_lead: false,
            ..
        } => Err(denied("only the board lead agent may create tasks")),
    }
}

/// Update an existing task (row 3): a human with write, the lead agent, or
/// a non-lead agent updating a task currently assigned to itself.
pub fn can_update_task(
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board: &Board,
    task_assigned_agent_id: Option<boardctl_types::model::AgentId>,
) -> Result<(), DomainError> {
    match actor {
        ActorContext::User { .. } => {
            let member = member.ok_or_else(|| denied("no membership record"))?;
            if member_can_read(member, board) && member_can_write(member, board) {
                Ok(())
            } else {
                Err(denied("board write access required"))
            }
        }
        ActorContext::Agent {
            agent_id,
            is_board_lead,
        } => {
            let agent = acting_agent.ok_or_else(|| denied("unknown agent"))?;
            if agent.board_id != Some(board.id) {
                return Err(denied("agent may only act on its own board"));
            }
            if *is_board_lead || task_assigned_agent_id == Some(*agent_id) {
                Ok(())
            } else {
                Err(denied(
                    "agents may only update tasks assigned to themselves",
                ))
            }
        }
    }
}

/// Assign a task to someone other than the actor itself (row: "Assign to
/// others"): humans with write, or the lead agent. Non-lead agents may only
/// ever change their own task's assignment (reassign-to-self / unassign),
/// which `can_update_task` already permits without going through here.
pub fn can_assign_to_others(
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board: &Board,
) -> Result<(), DomainError> {
    match actor {
        ActorContext::User { .. } => {
            let member = member.ok_or_else(|| denied("no membership record"))?;
            if member_can_write(member, board) {
                Ok(())
            } else {
                Err(denied("board write access required"))
            }
        }
        ActorContext::Agent {
            is_board_lead: true,
            ..
        } => {
            let agent = acting_agent.ok_or_else(|| denied("unknown agent"))?;
            if agent.board_id == Some(board.id) {
                Ok(())
            } else {
                Err(denied("lead agent may only act on its own board"))
            }
        }
        ActorContext::Agent {
            is_board_lead: false,
            ..
        } => Err(denied(
            "only the board lead agent may assign tasks to others",
        )),
    }
}

/// Board leads can never be assigned a task (spec.md §3, §8 invariant),
/// regardless of who is attempting the assignment. Uses the literal
/// wording from spec.md scenario 2 since that is the one user-facing
/// phrasing the spec fixes.
pub fn check_not_assigning_to_lead(target_agent: &Agent) -> Result<(), DomainError> {
    if target_agent.is_board_lead {
        Err(denied("Board leads cannot assign tasks to themselves."))
    } else {
        Ok(())
    }
}

/// Update board metadata (row: "Update board meta"): write-access humans
/// only; no agent, lead or otherwise, may rename a board or change its
/// gateway.
pub fn can_update_board_meta(
    actor: &ActorContext,
    member: Option<&Member>,
    board: &Board,
) -> Result<(), DomainError> {
    match actor {
        ActorContext::User { .. } => {
            let member = member.ok_or_else(|| denied("no membership record"))?;
            if member_can_write(member, board) {
                Ok(())
            } else {
                Err(denied("board write access required"))
            }
        }
        ActorContext::Agent { .. } => Err(denied("agents may not update board metadata")),
    }
}

/// Create agent (row: "Create agent"): org admins directly, or via a
/// lead-agent request on its own board.
pub fn can_create_agent(
    actor: &ActorContext,
    member: Option<&Member>,
    acting_agent: Option<&Agent>,
    board: &Board,
) -> Result<(), DomainError> {
    match actor {
        ActorContext::User { .. } => {
            let member = member.ok_or_else(|| denied("no membership record"))?;
            if member.org_id == board.org_id && member.role == MemberRole::Admin {
                Ok(())
            } else {
                Err(denied(
                    "only an organization admin may create agents directly",
                ))
            }
        }
        ActorContext::Agent {
            is_board_lead: true,
            ..
        } => {
            let agent = acting_agent.ok_or_else(|| denied("unknown agent"))?;
            if agent.board_id == Some(board.id) {
                Ok(())
            } else {
                Err(denied("lead agent may only create agents on its own board"))
            }
        }
        ActorContext::Agent {
            is_board_lead: false,
            ..
        } => Err(denied("only the board lead agent may request new agents")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardctl_types::model::HeartbeatConfig;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn board(org: uuid::Uuid) -> Board {
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

    fn member(org: uuid::Uuid, role: MemberRole, grants: Vec<uuid::Uuid>) -> Member {
        Member {
            id: Uuid::new_v4(),
            org_id: org,
            user_id: Uuid::new_v4(),
            role,
            board_write_grants: grants,
        }
    }

    fn agent(board_id: uuid::Uuid, is_lead: bool) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            board_id: Some(board_id),
            name: "Lead".to_string(),
            is_board_lead: is_lead,
            openclaw_session_id: None,
            heartbeat_config: HeartbeatConfig::default(),
            identity_profile: BTreeMap::new(),
            identity_template: None,
            soul_template: None,
            agent_token_hash: None,
            status: boardctl_types::model::AgentStatus::Online,
            last_seen_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn non_lead_agent_cannot_create_task() {
        let org = Uuid::new_v4();
        let b = board(org);
        let a = agent(b.id, false);
        let actor = ActorContext::Agent {
            agent_id: a.id,
            is_board_lead: false,
        };
        let err = can_create_task(&actor, None, Some(&a), &b).unwrap_err();
        assert!(matches!(err, DomainError::AuthorizationDenied { .. }));
    }

    #[test]
    fn lead_agent_can_create_task_on_own_board() {
        let org = Uuid::new_v4();
        let b = board(org);
        let lead = agent(b.id, true);
        let actor = ActorContext::Agent {
            agent_id: lead.id,
            is_board_lead: true,
        };
        assert!(can_create_task(&actor, None, Some(&lead), &b).is_ok());
    }

    #[test]
    fn member_without_write_grant_cannot_update_board_meta() {
        let org = Uuid::new_v4();
        let b = board(org);
        let m = member(org, MemberRole::Member, vec![]);
        let actor = ActorContext::User { member_id: m.id };
        let err = can_update_board_meta(&actor, Some(&m), &b).unwrap_err();
        assert!(matches!(err, DomainError::AuthorizationDenied { .. }));
    }

    #[test]
    fn admin_implies_write_on_every_board() {
        let org = Uuid::new_v4();
        let b = board(org);
        let m = member(org, MemberRole::Admin, vec![]);
        assert!(member_can_write(&m, &b));
    }

    #[test]
    fn non_lead_agent_may_update_only_its_own_assigned_task() {
        let org = Uuid::new_v4();
        let b = board(org);
        let a = agent(b.id, false);
        let actor = ActorContext::Agent {
            agent_id: a.id,
            is_board_lead: false,
        };
        assert!(can_update_task(&actor, None, Some(&a), &b, Some(a.id)).is_ok());
        let err = can_update_task(&actor, None, Some(&a), &b, Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, DomainError::AuthorizationDenied { .. }));
    }

    #[test]
    fn assigning_to_a_lead_agent_is_always_rejected() {
        let org = Uuid::new_v4();
        let b = board(org);
        let lead = agent(b.id, true);
        assert!(check_not_assigning_to_lead(&lead).is_err());
    }
}
