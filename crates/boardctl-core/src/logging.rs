use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{ControlPlaneConfig, LogFormat};

/// Initializes the global `tracing` subscriber from `config`, honoring
/// `RUST_LOG`/`LOG_LEVEL` overrides. Call once at process startup.
pub fn init_tracing(config: &ControlPlaneConfig) {
    let default_level: LevelFilter = config.log_level.parse().unwrap_or(LevelFilter::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .compact()
                .init();
        }
    }
}
