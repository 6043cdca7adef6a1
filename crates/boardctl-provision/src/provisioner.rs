use serde_json::json;
use tracing::warn;

use boardctl_gateway::{methods, GatewayBackoff, GatewayClient, GatewayError};
use boardctl_types::model::Agent;

use crate::error::ProvisionError;
use crate::files::{
    main_template_for, should_include_bootstrap, BOOTSTRAP_FILE, PRESERVE_EDITABLE_FILES,
    STATIC_OVERWRITE_FILES,
};
use crate::identity::build_identity_context_for_agent;
use crate::registry::{patch_gateway_agent_entries, AgentRegistryEntry};
use crate::render::{render_file, RenderContext};
use crate::session::{agent_key, session_key, workspace_path};
use crate::tokens::{generate_token, hash_token, render_tools_md};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionAction {
    Provision,
    Update,
}

#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub action: ProvisionAction,
    pub force_bootstrap: bool,
    pub reset_session: bool,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            action: ProvisionAction::Provision,
            force_bootstrap: false,
            reset_session: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardContext {
    pub name: String,
    pub objective: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub workspace_root: String,
    pub main_session_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    pub session_key: String,
    pub workspace_path: String,
    pub auth_token_hash: String,
    pub files_written: Vec<String>,
    pub files_skipped: Vec<String>,
}

fn validate_gateway(gateway: &GatewayContext) -> Result<(), ProvisionError> {
    if gateway.workspace_root.trim().is_empty() {
        return Err(ProvisionError::InvalidGatewayConfig(
            "gateway workspace_root is required".to_string(),
        ));
    }
    if gateway.main_session_key.trim().is_empty() {
        return Err(ProvisionError::InvalidGatewayConfig(
            "gateway main_session_key is required".to_string(),
        ));
    }
    Ok(())
}

/// Writes one rendered file to the gateway via `agents.files.set`, unless
/// its content is empty or it's a preserve-editable file already present.
/// An `"unsupported file"` gateway error is swallowed as a per-file skip,
/// not a failure of the whole provision call.
async fn set_agent_file(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    agent_id: &str,
    file: &str,
    content: &str,
    already_present: bool,
) -> Result<bool, GatewayError> {
    if content.is_empty() {
        return Ok(false);
    }
    if PRESERVE_EDITABLE_FILES.contains(&file) && already_present {
        return Ok(false);
    }

    let result = client
        .call_with_backoff(
            methods::AGENTS_FILES_SET,
            json!({ "agentId": agent_id, "file": file, "content": content }),
            backoff,
        )
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(GatewayError::Rpc(message)) if message.to_lowercase().contains("unsupported file") => {
            warn!(file, "gateway rejected unsupported file, skipping");
            Ok(false)
        }
        Err(other) => Err(other),
    }
}

/// Renders and writes the full file catalogue for a board-scoped agent,
/// then upserts its entry into the gateway's `agents.list` registry.
pub async fn provision_agent(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    agent: &Agent,
    board: Option<&BoardContext>,
    gateway: &GatewayContext,
    options: &ProvisionOptions,
    existing_auth_token: Option<&str>,
    existing_files_index: Option<&[String]>,
) -> Result<ProvisionOutcome, ProvisionError> {
    validate_gateway(gateway)?;

    let session = session_key(agent);
    let workspace = workspace_path(agent, &gateway.workspace_root)
        .map_err(ProvisionError::InvalidGatewayConfig)?;
    let auth_token = existing_auth_token
        .map(|t| t.to_string())
        .unwrap_or_else(generate_token);
    let identity = build_identity_context_for_agent(agent);

    let ctx = RenderContext {
        agent_name: agent.name.clone(),
        agent_id: agent.id.to_string(),
        session_key: session.clone(),
        workspace_path: workspace.clone(),
        base_url: gateway.base_url.clone(),
        auth_token: auth_token.clone(),
        main_session_key: gateway.main_session_key.clone(),
        is_board_lead: agent.is_board_lead,
        board_name: board.map(|b| b.name.clone()),
        board_objective: board.and_then(|b| b.objective.clone()),
        identity,
    };

    let mut files: Vec<&str> = STATIC_OVERWRITE_FILES.to_vec();
    if should_include_bootstrap(
        options.action == ProvisionAction::Update,
        options.force_bootstrap,
        existing_files_index,
    ) {
        files.push(BOOTSTRAP_FILE);
    }
    for preserved in PRESERVE_EDITABLE_FILES {
        files.push(preserved);
    }

    let mut files_written = Vec::new();
    let mut files_skipped = Vec::new();

    for file in files {
        let already_present = existing_files_index
            .map(|index| index.iter().any(|f| f == file))
            .unwrap_or(false);
        let mut content = render_file(file, &ctx);
        if file == "TOOLS.md" {
            content = render_tools_md(&auth_token);
        }
        let written = set_agent_file(
            client,
            backoff,
            &agent.id.to_string(),
            file,
            &content,
            already_present,
        )
        .await?;
        if written {
            files_written.push(file.to_string());
        } else {
            files_skipped.push(file.to_string());
        }
    }

    let entry = AgentRegistryEntry {
        id: agent_key(agent),
        workspace: workspace.clone(),
        heartbeat: agent.heartbeat_config.clone(),
    };
    patch_gateway_agent_entries(client, backoff, std::slice::from_ref(&entry)).await?;

    if options.reset_session {
        client
            .call_with_backoff(methods::SESSIONS_RESET, json!({ "key": session }), backoff)
            .await?;
    }

    Ok(ProvisionOutcome {
        session_key: session,
        workspace_path: workspace,
        auth_token_hash: hash_token(&auth_token),
        files_written,
        files_skipped,
    })
}

/// Provisions the gateway's main agent. Uses the `MAIN_*.md` template set
/// (via `main_template_for`) and carries no board context.
pub async fn provision_main_agent(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    agent: &Agent,
    gateway: &GatewayContext,
    options: &ProvisionOptions,
    existing_auth_token: Option<&str>,
    existing_files_index: Option<&[String]>,
) -> Result<ProvisionOutcome, ProvisionError> {
    validate_gateway(gateway)?;

    let session = gateway.main_session_key.clone();
    let auth_token = existing_auth_token
        .map(|t| t.to_string())
        .unwrap_or_else(generate_token);
    let identity = build_identity_context_for_agent(agent);

    let ctx = RenderContext {
        agent_name: agent.name.clone(),
        agent_id: agent.id.to_string(),
        session_key: session.clone(),
        workspace_path: gateway.workspace_root.clone(),
        base_url: gateway.base_url.clone(),
        auth_token: auth_token.clone(),
        main_session_key: session.clone(),
        is_board_lead: false,
        board_name: None,
        board_objective: None,
        identity,
    };

    let mut files_written = Vec::new();
    let mut files_skipped = Vec::new();

    for file in STATIC_OVERWRITE_FILES {
        let template_file = main_template_for(file);
        let already_present = existing_files_index
            .map(|index| index.iter().any(|f| f == template_file))
            .unwrap_or(false);
        let mut content = render_file(file, &ctx);
        if *file == "TOOLS.md" {
            content = render_tools_md(&auth_token);
        }
        let written = set_agent_file(
            client,
            backoff,
            &agent.id.to_string(),
            template_file,
            &content,
            already_present,
        )
        .await?;
        if written {
            files_written.push(template_file.to_string());
        } else {
            files_skipped.push(template_file.to_string());
        }
    }

    if options.reset_session {
        client
            .call_with_backoff(methods::SESSIONS_RESET, json!({ "key": session }), backoff)
            .await?;
    }

    Ok(ProvisionOutcome {
        session_key: session,
        workspace_path: gateway.workspace_root.clone(),
        auth_token_hash: hash_token(&auth_token),
        files_written,
        files_skipped,
    })
}

/// Removes an agent from the gateway's `agents.list` registry and deletes
/// its session. Returns the workspace path it used to own.
pub async fn cleanup_agent(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    agent: &Agent,
    gateway: &GatewayContext,
) -> Result<String, ProvisionError> {
    let workspace = workspace_path(agent, &gateway.workspace_root)
        .map_err(ProvisionError::InvalidGatewayConfig)?;
    let session = session_key(agent);

    let current = client
        .call_with_backoff(methods::CONFIG_GET, json!({}), backoff)
        .await?;
    let hash = current.get("hash").cloned();
    let agents_list = current
        .get("config")
        .and_then(|c| c.get("agents"))
        .and_then(|a| a.get("list"))
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default();
    let remaining: Vec<_> = agents_list
        .into_iter()
        .filter(|entry| entry.get("id").and_then(|v| v.as_str()) != Some(agent_key(agent).as_str()))
        .collect();

    let mut patch_params = json!({ "raw": { "agents": { "list": remaining } } });
    if let Some(hash) = hash {
        patch_params["baseHash"] = hash;
    }
    client.call(methods::CONFIG_PATCH, patch_params).await?;

    client
        .call_with_backoff(methods::SESSIONS_DELETE, json!({ "key": session }), backoff)
        .await?;

    Ok(workspace)
}
