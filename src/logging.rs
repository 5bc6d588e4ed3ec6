//! Logging setup
//!
//! Every module logs through the `log` facade; this installs the
//! `env_logger` backend once at startup.
//!
//! # Levels
//!
//! - **info** (default): lifecycle milestones
//! - **debug**: protocol binding, device attach/detach, engine metrics
//! - **trace**: per-event dispatch and frame pacing
//!
//! `RUST_LOG` always wins over the level chosen here.

use env_logger::{Builder, Env};

/// Default filter for the requested verbosity
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install the global logger. Later calls are ignored.
pub fn init_logging(debug: bool) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter(debug)))
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::debug!("📝 Logging initialised at {}", default_filter(debug));
    }
}
