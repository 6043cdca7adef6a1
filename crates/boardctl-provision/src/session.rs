use boardctl_core::ids::slugify;
use boardctl_types::model::Agent;

const SESSION_KEY_PARTS_MIN: usize = 2;

/// The stable key embedded in an agent's session id (the part between the
/// first two colons), or a slug of its display name if no session id is
/// set yet. Deriving from the session key (not the display name) avoids
/// collisions between boards that share a display name like "Lead Agent".
pub fn agent_key(agent: &Agent) -> String {
    if let Some(session_key) = &agent.openclaw_session_id {
        if let Some(rest) = session_key.strip_prefix("agent:") {
            let parts: Vec<&str> = session_key.split(':').collect();
            if parts.len() >= SESSION_KEY_PARTS_MIN {
                let candidate = parts[1].trim();
                if !candidate.is_empty() {
                    return candidate.to_string();
                }
            }
            let _ = rest;
        }
    }
    slugify(&agent.name)
}

/// Either the agent's stored session id, or the derived `agent:<slug>:main`
/// form for an agent that hasn't been assigned one yet.
pub fn session_key(agent: &Agent) -> String {
    match &agent.openclaw_session_id {
        Some(key) if !key.trim().is_empty() => key.clone(),
        _ => format!("agent:{}:main", slugify(&agent_key(agent))),
    }
}

/// `<workspace_root>/workspace-<slug(agent_key)>`.
pub fn workspace_path(agent: &Agent, workspace_root: &str) -> Result<String, String> {
    if workspace_root.trim().is_empty() {
        return Err("gateway workspace_root is required".to_string());
    }
    let root = workspace_root.trim_end_matches('/');
    let key = agent_key(agent);
    Ok(format!("{root}/workspace-{}", slugify(&key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardctl_types::model::{AgentStatus, HeartbeatConfig};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn agent_with_session(session: Option<&str>, name: &str) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            board_id: Some(Uuid::new_v4()),
            name: name.to_string(),
            is_board_lead: false,
            openclaw_session_id: session.map(|s| s.to_string()),
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

    #[test]
    fn agent_key_prefers_session_id_over_name() {
        let agent = agent_with_session(Some("agent:scout-42:main"), "Lead Agent");
        assert_eq!(agent_key(&agent), "scout-42");
    }

    #[test]
    fn agent_key_falls_back_to_slugified_name() {
        let agent = agent_with_session(None, "Lead Agent");
        assert_eq!(agent_key(&agent), "lead-agent");
    }

    #[test]
    fn workspace_path_uses_agent_key_not_display_name() {
        let agent = agent_with_session(Some("agent:board-a-lead:main"), "Lead Agent");
        let path = workspace_path(&agent, "/ws").expect("path");
        assert_eq!(path, "/ws/workspace-board-a-lead");
    }

    #[test]
    fn workspace_path_rejects_empty_root() {
        let agent = agent_with_session(None, "Scout");
        assert!(workspace_path(&agent, "").is_err());
    }

    #[test]
    fn two_boards_sharing_a_display_name_do_not_collide() {
        let a = agent_with_session(Some("agent:board-a-lead:main"), "Lead Agent");
        let b = agent_with_session(Some("agent:board-b-lead:main"), "Lead Agent");
        assert_ne!(
            workspace_path(&a, "/ws").unwrap(),
            workspace_path(&b, "/ws").unwrap()
        );
    }
}
