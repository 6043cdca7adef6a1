use uuid::Uuid;

use crate::model::{AgentId, MemberId};

/// Who is making a request. Authorization decisions in `boardctl-board`
/// switch on this, matching the user-token/agent-token split in spec §6.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorContext {
    User {
        member_id: MemberId,
    },
    Agent {
        agent_id: AgentId,
        is_board_lead: bool,
    },
}

impl ActorContext {
    pub fn is_user(&self) -> bool {
        matches!(self, ActorContext::User { .. })
    }

    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            ActorContext::Agent { agent_id, .. } => Some(*agent_id),
            ActorContext::User { .. } => None,
        }
    }

    pub fn is_board_lead(&self) -> bool {
        matches!(
            self,
            ActorContext::Agent {
                is_board_lead: true,
                ..
            }
        )
    }
}

/// Placeholder user id used where the spec leaves user identity opaque to
/// the control plane (no user directory is modeled).
pub fn anonymous_member_id() -> Uuid {
    Uuid::nil()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_is_none_for_user_actors() {
        let actor = ActorContext::User {
            member_id: Uuid::new_v4(),
        };
        assert_eq!(actor.agent_id(), None);
        assert!(actor.is_user());
    }

    #[test]
    fn board_lead_flag_only_true_for_lead_agents() {
        let lead = ActorContext::Agent {
            agent_id: Uuid::new_v4(),
            is_board_lead: true,
        };
        let member = ActorContext::Agent {
            agent_id: Uuid::new_v4(),
            is_board_lead: false,
        };
        assert!(lead.is_board_lead());
        assert!(!member.is_board_lead());
    }
}
