//! Telemetry initialisation for the smoke check.
//!
//! Structured JSON logs to stdout only. Field values, plaintexts and
//! ciphertexts are never logged, so the cipher library's `debug!` events are
//! always let through: they carry only paths, record types and counts.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Directive appended to the configured level so batch progress is visible.
const CIPHER_DIRECTIVE: &str = "transit_cipher=debug";

/// Initialise the tracing subscriber at the configured log level.
///
/// `RUST_LOG` takes precedence when set.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter or the subscriber
/// has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(log_level)?,
    };

    tracing_subscriber::fmt()
        .json()
        .with_target(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise transit-smoke tracing subscriber: {e}"))
}

/// `log_level` for everything, plus debug events from the cipher library.
fn default_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(format!("{},{CIPHER_DIRECTIVE}", log_level.trim()))
        .with_context(|| format!("invalid log level {log_level:?}"))
}
