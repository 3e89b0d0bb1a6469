//! # Logging
//!
//! Tracing subscriber setup driven by [`LoggingConfig`].
//!
//! `RUST_LOG` wins over the configured level when set, so operators can
//! crank verbosity without touching config files.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global subscriber. Calling it again (tests, embedders that
/// already installed one) is a harmless no-op.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .try_init();
}

/// [`init`] with default settings, for examples and tests.
pub fn init_default() {
    init(&LoggingConfig::default());
}
