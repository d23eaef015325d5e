pub mod config;
pub mod facility; // Static care-facility directory for the results map
pub mod geo; // Best-effort device position with a bounded wait
pub mod history; // Bounded on-device log of completed sessions
pub mod models; // Wire-stable triage data shapes
pub mod reasoner; // Remote reasoning boundary: prompts, retry, extraction, fallback
pub mod session; // Triage state machine and async flow driver
pub mod voice; // Audio-duplex triage adapter

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a host process. `RUST_LOG` overrides the
/// built-in default filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
