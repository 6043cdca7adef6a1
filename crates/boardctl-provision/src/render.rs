use crate::files::{HEARTBEAT_AGENT_TEMPLATE, HEARTBEAT_LEAD_TEMPLATE, MEMORY_FALLBACK_CONTENT};
use crate::identity::IdentityContext;

/// Everything a file template needs to render. Plain Rust struct standing
/// in for the original's Jinja template-variable dict.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub agent_name: String,
    pub agent_id: String,
    pub session_key: String,
    pub workspace_path: String,
    pub base_url: String,
    pub auth_token: String,
    pub main_session_key: String,
    pub is_board_lead: bool,
    pub board_name: Option<String>,
    pub board_objective: Option<String>,
    pub identity: IdentityContext,
}

fn heartbeat_template_name(is_board_lead: bool) -> &'static str {
    if is_board_lead {
        HEARTBEAT_LEAD_TEMPLATE
    } else {
        HEARTBEAT_AGENT_TEMPLATE
    }
}

/// Renders the content for `file` given `ctx`. Board-scoped files include
/// the board name/objective; the gateway-main variant of the call passes a
/// `ctx` with `board_name = None`.
pub fn render_file(file: &str, ctx: &RenderContext) -> String {
    match file {
        "AGENTS.md" => format!(
            "# {name}\n\nRole: {role}\nCommunication style: {style}\nSession: {session}\n",
            name = ctx.agent_name,
            role = ctx.identity.role,
            style = ctx.identity.communication_style,
            session = ctx.session_key,
        ),
        "SOUL.md" => format!(
            "# Soul\n\nPurpose: {purpose}\nPersonality: {personality}\n",
            purpose = if ctx.identity.purpose.is_empty() {
                "Support the board's objective."
            } else {
                ctx.identity.purpose.as_str()
            },
            personality = ctx.identity.personality,
        ),
        "AUTONOMY.md" => format!(
            "# Autonomy\n\nLevel: {level}\nUpdate cadence: {cadence}\n",
            level = ctx.identity.autonomy_level,
            cadence = ctx.identity.update_cadence,
        ),
        "TOOLS.md" => format!("AUTH_TOKEN={token}\n", token = ctx.auth_token),
        "IDENTITY.md" => format!(
            "# Identity\n\n{emoji} {name} — {role}\nOutput format: {format}\nCustom instructions: {instructions}\n",
            emoji = ctx.identity.emoji,
            name = ctx.agent_name,
            role = ctx.identity.role,
            format = ctx.identity.output_format,
            instructions = ctx.identity.custom_instructions,
        ),
        "BOOT.md" => format!(
            "# Boot\n\nBase URL: {base_url}\nWorkspace: {workspace}\nMain session: {main}\n",
            base_url = ctx.base_url,
            workspace = ctx.workspace_path,
            main = ctx.main_session_key,
        ),
        "HEARTBEAT.md" => format!(
            "# Heartbeat ({template})\n\nAgent: {name}\n",
            template = heartbeat_template_name(ctx.is_board_lead),
            name = ctx.agent_name,
        ),
        "BOOTSTRAP.md" => {
            let board = ctx.board_name.clone().unwrap_or_else(|| "gateway".to_string());
            let objective = ctx.board_objective.clone().unwrap_or_default();
            format!("# Bootstrap\n\nWelcome to {board}.\n{objective}\n")
        }
        "MEMORY.md" => MEMORY_FALLBACK_CONTENT.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext {
            agent_name: "Scout".to_string(),
            agent_id: "agent-1".to_string(),
            session_key: "agent:scout:main".to_string(),
            workspace_path: "/ws/workspace-scout".to_string(),
            base_url: "http://localhost:8080".to_string(),
            auth_token: "tok-123".to_string(),
            main_session_key: "main".to_string(),
            is_board_lead: false,
            board_name: Some("Launch Board".to_string()),
            board_objective: Some("Ship v1".to_string()),
            identity: IdentityContext {
                role: "Generalist".to_string(),
                communication_style: "direct".to_string(),
                emoji: ":gear:".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn tools_md_embeds_auth_token() {
        assert_eq!(render_file("TOOLS.md", &ctx()), "AUTH_TOKEN=tok-123\n");
    }

    #[test]
    fn memory_md_uses_literal_fallback() {
        assert_eq!(render_file("MEMORY.md", &ctx()), MEMORY_FALLBACK_CONTENT);
    }

    #[test]
    fn heartbeat_reflects_lead_flag() {
        let mut lead_ctx = ctx();
        lead_ctx.is_board_lead = true;
        assert!(render_file("HEARTBEAT.md", &lead_ctx).contains(HEARTBEAT_LEAD_TEMPLATE));
        assert!(render_file("HEARTBEAT.md", &ctx()).contains(HEARTBEAT_AGENT_TEMPLATE));
    }
}
