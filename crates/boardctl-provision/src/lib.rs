//! Agent Provisioner and Template Sync Engine: rendering per-agent
//! identity/boot/heartbeat files to a gateway, gateway registry patching,
//! token rotation, and reconciliation against live templates.

pub mod error;
pub mod files;
pub mod identity;
pub mod pause;
pub mod provisioner;
pub mod registry;
pub mod render;
pub mod session;
pub mod sync;
pub mod tokens;

pub use error::ProvisionError;
pub use provisioner::{
    cleanup_agent, provision_agent, provision_main_agent, BoardContext, GatewayContext,
    ProvisionAction, ProvisionOptions, ProvisionOutcome,
};
pub use sync::{SyncError, SyncOptions, SyncResult};
