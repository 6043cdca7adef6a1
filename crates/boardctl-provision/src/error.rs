use thiserror::Error;

use boardctl_gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0}")]
    InvalidGatewayConfig(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("rotate_tokens=true required to recover a missing auth token")]
    RotateTokensRequired,
}
