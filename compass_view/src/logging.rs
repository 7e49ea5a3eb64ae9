//! Console logging for the compass viewer.
//!
//! Configurable via the RUST_LOG environment variable, `info` by default.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    // bevy's own LogPlugin is disabled, so this is the only global subscriber
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}
