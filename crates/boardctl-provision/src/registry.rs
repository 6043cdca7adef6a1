use boardctl_gateway::{methods, GatewayBackoff, GatewayClient, GatewayError};
use boardctl_types::model::HeartbeatConfig;
use serde_json::{json, Value};

/// A single agent's entry in the gateway's `agents.list` registry.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRegistryEntry {
    pub id: String,
    pub workspace: String,
    pub heartbeat: HeartbeatConfig,
}

fn entry_json(entry: &AgentRegistryEntry) -> Value {
    json!({
        "id": entry.id,
        "workspace": entry.workspace,
        "heartbeat": {
            "every": entry.heartbeat.every,
            "target": entry.heartbeat.target,
        },
    })
}

/// Replaces (or appends) the entry matching `entry.id` inside `agents_list`,
/// preserving every other entry's fields untouched.
fn upsert(agents_list: &[Value], entry: &AgentRegistryEntry) -> Vec<Value> {
    let mut out = Vec::with_capacity(agents_list.len() + 1);
    let mut replaced = false;
    for existing in agents_list {
        let same_id = existing.get("id").and_then(Value::as_str) == Some(entry.id.as_str());
        if same_id {
            out.push(entry_json(entry));
            replaced = true;
        } else {
            out.push(existing.clone());
        }
    }
    if !replaced {
        out.push(entry_json(entry));
    }
    out
}

fn upsert_many(agents_list: &[Value], entries: &[AgentRegistryEntry]) -> Vec<Value> {
    let mut current = agents_list.to_vec();
    for entry in entries {
        current = upsert(&current, entry);
    }
    current
}

const MAX_HASH_CONFLICT_RETRIES: usize = 3;

/// Fetches `config.get`, upserts `entries` into `config.agents.list`,
/// preserving all other fields, and writes back with `config.patch(raw,
/// baseHash)`. On a hash-mismatch rejection, refetches and retries — a
/// single-writer optimistic-concurrency protocol, no distributed lock
/// needed.
pub async fn patch_gateway_agent_entries(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    entries: &[AgentRegistryEntry],
) -> Result<(), GatewayError> {
    for _ in 0..MAX_HASH_CONFLICT_RETRIES {
        let current = client
            .call_with_backoff(methods::CONFIG_GET, json!({}), backoff)
            .await?;
        let hash = current
            .get("hash")
            .cloned()
            .ok_or(GatewayError::MalformedResponse)?;
        let agents_list = current
            .get("config")
            .and_then(|c| c.get("agents"))
            .and_then(|a| a.get("list"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let updated_list = upsert_many(&agents_list, entries);

        let patch = json!({ "agents": { "list": updated_list } });

        let result = client
            .call(
                methods::CONFIG_PATCH,
                json!({ "raw": patch, "baseHash": hash }),
            )
            .await;

        match result {
            Ok(_) => return Ok(()),
            Err(GatewayError::Rpc(message)) if message.to_lowercase().contains("hash") => {
                continue;
            }
            Err(other) => return Err(other),
        }
    }

    Err(GatewayError::Rpc(
        "gateway config patch conflict exceeded retry limit".to_string(),
    ))
}

/// Bulk heartbeat application across an entire gateway's agents in a
/// single `config.patch`, avoiding one round trip per agent.
pub async fn patch_gateway_agent_heartbeats(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    entries: &[AgentRegistryEntry],
) -> Result<(), GatewayError> {
    patch_gateway_agent_entries(client, backoff, entries).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, workspace: &str) -> AgentRegistryEntry {
        AgentRegistryEntry {
            id: id.to_string(),
            workspace: workspace.to_string(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    #[test]
    fn upsert_replaces_matching_id_and_preserves_others() {
        let existing = vec![
            json!({"id": "scout", "workspace": "/ws/old", "extra": "keep"}),
            json!({"id": "lead", "workspace": "/ws/lead"}),
        ];
        let updated = upsert(&existing, &entry("scout", "/ws/new"));
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0]["workspace"], "/ws/new");
        assert_eq!(updated[1]["id"], "lead");
    }

    #[test]
    fn upsert_appends_when_id_not_present() {
        let existing = vec![json!({"id": "lead", "workspace": "/ws/lead"})];
        let updated = upsert(&existing, &entry("scout", "/ws/scout"));
        assert_eq!(updated.len(), 2);
    }

    #[test]
    fn upsert_many_applies_every_entry() {
        let existing: Vec<Value> = vec![];
        let updated = upsert_many(&existing, &[entry("a", "/ws/a"), entry("b", "/ws/b")]);
        assert_eq!(updated.len(), 2);
    }
}
