//! Gateway Coordinator: a JSON-RPC client with backoff, session
//! lifecycling, compatibility probing, and lead/main/user message routing.

pub mod backoff;
pub mod client;
pub mod compat;
pub mod coordinator;
pub mod error;
pub mod methods;

pub use backoff::GatewayBackoff;
pub use client::{GatewayClient, GatewayClientConfig};
pub use compat::{check_compatibility, CompatibilityResult};
pub use coordinator::{BroadcastSummary, GatewayCoordinator, SessionEntry};
pub use error::GatewayError;
