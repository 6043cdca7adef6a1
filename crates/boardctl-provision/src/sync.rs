use std::collections::HashSet;

use boardctl_gateway::{methods, GatewayBackoff, GatewayClient, GatewayError};
use boardctl_types::model::{Agent, AgentId, BoardId};
use serde_json::json;

use crate::provisioner::{
    provision_agent, provision_main_agent, BoardContext, GatewayContext, ProvisionAction,
    ProvisionOptions,
};
use crate::tokens::{generate_token, hash_token, recover_auth_token};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub include_main: bool,
    pub reset_sessions: bool,
    pub rotate_tokens: bool,
    pub force_bootstrap: bool,
    pub board_id: Option<BoardId>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            include_main: true,
            reset_sessions: false,
            rotate_tokens: false,
            force_bootstrap: false,
            board_id: None,
        }
    }
}

/// Everything `reconcile` needs about one agent; callers resolve these
/// from durable state and the gateway before calling in, so this crate
/// doesn't need to depend on a particular storage layer.
#[derive(Debug, Clone)]
pub struct AgentSyncInput {
    pub agent: Agent,
    pub board: Option<BoardContext>,
    pub tools_md: Option<String>,
    pub existing_files_index: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncErrorSeverity {
    Warning,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncErrorRecord {
    pub agent_id: Option<AgentId>,
    pub board_id: Option<BoardId>,
    pub severity: SyncErrorSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResult {
    pub agents_updated: Vec<AgentId>,
    pub agents_skipped: Vec<AgentId>,
    pub main_updated: bool,
    pub errors: Vec<SyncErrorRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Resolves the token to provision with for one agent, per
/// `_resolve_agent_auth_token`'s fall-through behavior: a hash mismatch is
/// a warning, not fatal, unless `rotate_tokens` is set.
fn resolve_agent_auth_token(
    agent: &Agent,
    tools_md: Option<&str>,
    rotate_tokens: bool,
) -> Result<(Option<String>, Option<SyncErrorRecord>), SyncErrorRecord> {
    let recovered = tools_md.and_then(recover_auth_token);

    match recovered {
        None => {
            if rotate_tokens {
                Ok((None, None))
            } else {
                Err(SyncErrorRecord {
                    agent_id: Some(agent.id),
                    board_id: agent.board_id,
                    severity: SyncErrorSeverity::Warning,
                    message: "rotate_tokens=true required to recover a missing auth token"
                        .to_string(),
                })
            }
        }
        Some(token) => {
            let mismatch = agent
                .agent_token_hash
                .as_ref()
                .is_some_and(|stored| *stored != hash_token(&token));
            if mismatch && rotate_tokens {
                Ok((None, None))
            } else if mismatch {
                Ok((
                    Some(token),
                    Some(SyncErrorRecord {
                        agent_id: Some(agent.id),
                        board_id: agent.board_id,
                        severity: SyncErrorSeverity::Warning,
                        message: "auth token hash mismatch; proceeding with gateway-reported token"
                            .to_string(),
                    }),
                ))
            } else {
                Ok((Some(token), None))
            }
        }
    }
}

/// Reconciles every agent in `agents` (and, if `options.include_main`,
/// `main_agent`) against their templates. A fatal error on one agent
/// stops the loop for remaining board agents but still attempts the
/// main-agent sync, unless the fatal error was resolving the main agent.
pub async fn reconcile(
    client: &GatewayClient,
    backoff: GatewayBackoff,
    gateway: &GatewayContext,
    agents: Vec<AgentSyncInput>,
    paused_board_ids: &HashSet<BoardId>,
    main_agent: Option<AgentSyncInput>,
    options: SyncOptions,
) -> SyncResult {
    let mut result = SyncResult::default();

    if let Err(err) = client
        .call_with_backoff(methods::AGENTS_LIST, json!({}), backoff)
        .await
    {
        result.errors.push(SyncErrorRecord {
            agent_id: None,
            board_id: None,
            severity: SyncErrorSeverity::Fatal,
            message: format!("gateway unreachable: {err}"),
        });
        return result;
    }

    let mut stop_sync = false;

    for input in agents {
        if let Some(board_id) = input.agent.board_id {
            if paused_board_ids.contains(&board_id) {
                continue;
            }
        }
        if let Some(filter) = options.board_id {
            if input.agent.board_id != Some(filter) {
                continue;
            }
        }

        if stop_sync {
            result.agents_skipped.push(input.agent.id);
            continue;
        }

        let token_resolution = resolve_agent_auth_token(
            &input.agent,
            input.tools_md.as_deref(),
            options.rotate_tokens,
        );

        let existing_token = match token_resolution {
            Ok((token, warning)) => {
                if let Some(warning) = warning {
                    result.errors.push(warning);
                }
                token
            }
            Err(skip_error) => {
                result.errors.push(skip_error);
                result.agents_skipped.push(input.agent.id);
                continue;
            }
        };

        let provision_options = ProvisionOptions {
            action: ProvisionAction::Update,
            force_bootstrap: options.force_bootstrap,
            reset_session: options.reset_sessions,
        };

        let outcome = provision_agent(
            client,
            backoff,
            &input.agent,
            input.board.as_ref(),
            gateway,
            &provision_options,
            existing_token.as_deref(),
            input.existing_files_index.as_deref(),
        )
        .await;

        match outcome {
            Ok(_) => result.agents_updated.push(input.agent.id),
            Err(err) => {
                result.errors.push(SyncErrorRecord {
                    agent_id: Some(input.agent.id),
                    board_id: input.agent.board_id,
                    severity: SyncErrorSeverity::Fatal,
                    message: err.to_string(),
                });
                result.agents_skipped.push(input.agent.id);
                stop_sync = true;
            }
        }
    }

    if options.include_main {
        if let Some(main_input) = main_agent {
            let existing_token = main_input
                .tools_md
                .as_deref()
                .and_then(recover_auth_token)
                .or_else(|| options.rotate_tokens.then(generate_token));

            let provision_options = ProvisionOptions {
                action: ProvisionAction::Update,
                force_bootstrap: options.force_bootstrap,
                reset_session: options.reset_sessions,
            };

            let outcome = provision_main_agent(
                client,
                backoff,
                &main_input.agent,
                gateway,
                &provision_options,
                existing_token.as_deref(),
                main_input.existing_files_index.as_deref(),
            )
            .await;

            match outcome {
                Ok(_) => result.main_updated = true,
                Err(err) => result.errors.push(SyncErrorRecord {
                    agent_id: Some(main_input.agent.id),
                    board_id: None,
                    severity: SyncErrorSeverity::Fatal,
                    message: err.to_string(),
                }),
            }
        }
    }

    result
}
