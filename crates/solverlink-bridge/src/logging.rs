//! Logging setup - `tracing` subscriber for bridge diagnostics
//!
//! Levels used by the bridge:
//! - `trace`: every dispatched native call
//! - `debug`: native failures, callback registration and release
//! - `info`: library loading
//! - `warn`: enumeration models dropped on marshaling failure

use once_cell::sync::OnceCell;
use solverlink_config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the global subscriber described by `config`
///
/// Only the first call has an effect. If the host process already installed
/// a subscriber, that one is kept.
pub fn init(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        let installed = if config.json {
            registry.with(fmt::layer().json().with_target(true)).try_init()
        } else {
            registry.with(fmt::layer().with_target(true)).try_init()
        };

        if installed.is_ok() {
            tracing::debug!(level = %config.level, json = config.json, "logging initialized");
        }
    });
}

/// True once [`init`] has run
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}
