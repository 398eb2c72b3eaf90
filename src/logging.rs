//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set; otherwise the profile picks the level. The
//! `local` profile prints human-readable lines, `dev` and `prod` emit JSON.

use tracing_subscriber::EnvFilter;

use crate::config::LogProfile;
use crate::error::ConfigError;

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(profile: LogProfile) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(profile.default_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match profile {
        LogProfile::Local => builder.try_init(),
        LogProfile::Dev | LogProfile::Prod => builder.json().try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
