//! Foundational utilities shared across the control plane crates: time,
//! identifiers, atomic local-file writes, configuration, and logging setup.

pub mod atomic_io;
pub mod config;
pub mod ids;
pub mod logging;
pub mod store;
pub mod time;

pub use atomic_io::write_text_atomic;
pub use config::ControlPlaneConfig;
pub use ids::{new_id, slugify};
pub use store::Store;
