// Tracing subscriber setup

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "cleaning_booking=debug,tower_http=info,info";

/// Installs the global fmt subscriber; `RUST_LOG` overrides the default filter
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}
