//! Builds a `GatewayCoordinator` for a board's configured gateway
//! (spec.md §4.5), the same construction the webhook dispatcher uses
//! (`boardctl-webhooks/src/dispatcher.rs`), reused here so every handler
//! that nudges or messages a gateway does it the same way.

use boardctl_core::Store;
use boardctl_gateway::{GatewayClient, GatewayClientConfig, GatewayCoordinator};
use boardctl_types::model::{Board, Gateway};

use crate::error::ApiError;

const GATEWAY_CALL_TIMEOUT_MS: u64 = 20_000;

pub fn gateway_for_board(store: &Store, board: &Board) -> Result<Gateway, ApiError> {
    let gateway_id = board
        .gateway_id
        .ok_or_else(|| ApiError::gateway_unreachable("board has no configured gateway"))?;
    store
        .get_gateway(gateway_id)
        .ok_or_else(|| ApiError::gateway_unreachable("configured gateway no longer exists"))
}

pub fn coordinator_for(gateway: &Gateway) -> Result<GatewayCoordinator, ApiError> {
    if !gateway.is_provisionable() {
        return Err(ApiError::gateway_unreachable(
            "gateway is missing url/main_session_key/workspace_root",
        ));
    }
    let client = GatewayClient::new(GatewayClientConfig {
        base_url: gateway.url.clone().unwrap_or_default(),
        token: gateway.token.clone(),
        request_timeout_ms: GATEWAY_CALL_TIMEOUT_MS,
    })?;
    Ok(GatewayCoordinator::new(client))
}
