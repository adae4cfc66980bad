//! Tracing subscriber setup

use crate::error::ConfigError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. `json` switches to one JSON
/// object per line.
///
/// # Errors
///
/// [`ConfigError::Tracing`] when `level` is not a valid filter or a global
/// subscriber is already installed.
pub fn init_tracing(level: &str, json: bool) -> Result<(), ConfigError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| ConfigError::Tracing(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    installed.map_err(|e| ConfigError::Tracing(e.to_string()))
}
