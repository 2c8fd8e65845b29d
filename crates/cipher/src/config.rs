//! Connection settings for the transit encryption service.
//!
//! Values are read from the same `VAULT_*` environment variables Vault's own
//! clients use, so a host already configured for the `vault` CLI works as is.

use std::{fmt, time::Duration};

use common::CipherError;
use serde::Deserialize;

/// Validated transit client configuration.
#[derive(Clone, Deserialize)]
pub struct TransitConfig {
    /// Base address of the service (`VAULT_ADDR`).
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Access token sent with every request (`VAULT_TOKEN`). **Required.**
    pub token: String,

    /// Mount path of the transit engine (`VAULT_TRANSIT_MOUNT`).
    #[serde(default = "default_transit_mount")]
    pub transit_mount: String,

    /// Per-request timeout in seconds (`VAULT_CLIENT_TIMEOUT`).
    ///
    /// Accepts a bare number of seconds or Vault's duration form with an
    /// `s`, `m` or `h` suffix (`60`, `60s`, `2m`).
    #[serde(
        default = "default_client_timeout",
        deserialize_with = "deserialize_seconds"
    )]
    pub client_timeout: u64,
}

fn default_addr() -> String {
    "https://127.0.0.1:8200".into()
}
fn default_transit_mount() -> String {
    "transit".into()
}
fn default_client_timeout() -> u64 {
    60
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSeconds {
    Number(u64),
    Text(String),
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match RawSeconds::deserialize(deserializer)? {
        RawSeconds::Number(n) => Ok(n),
        RawSeconds::Text(text) => parse_seconds(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse `60`, `60s`, `2m` or `1h` into whole seconds.
fn parse_seconds(text: &str) -> Result<u64, String> {
    let text = text.trim();
    let (digits, scale) = match text.as_bytes().last() {
        Some(b's') => (&text[..text.len() - 1], 1),
        Some(b'm') => (&text[..text.len() - 1], 60),
        Some(b'h') => (&text[..text.len() - 1], 3600),
        _ => (text, 1),
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .ok_or_else(|| format!("invalid client timeout {text:?}, expected e.g. `60` or `60s`"))
}

impl TransitConfig {
    /// Configuration for `addr` and `token` with every other setting defaulted.
    pub fn new(addr: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            token: token.into(),
            transit_mount: default_transit_mount(),
            client_timeout: default_client_timeout(),
        }
    }

    /// Load and validate configuration from `VAULT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Config`] if `VAULT_TOKEN` is absent or any value
    /// cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self, CipherError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("VAULT"))
            .build()
            .map_err(|e| {
                CipherError::Config(format!("failed to build configuration from environment: {e}"))
            })?;

        let c: TransitConfig = cfg
            .try_deserialize()
            .map_err(|e| CipherError::Config(format!("failed to deserialise configuration: {e}")))?;

        c.validate()?;
        Ok(c)
    }

    /// Transit mount path without surrounding slashes.
    pub fn mount(&self) -> &str {
        self.transit_mount.trim_matches('/')
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<(), CipherError> {
        ensure_non_empty(&self.addr, "VAULT_ADDR")?;
        ensure_non_empty(&self.token, "VAULT_TOKEN")?;
        ensure_non_empty(self.mount(), "VAULT_TRANSIT_MOUNT")?;
        if self.client_timeout == 0 {
            return Err(CipherError::Config("VAULT_CLIENT_TIMEOUT must be > 0".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for TransitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitConfig")
            .field("addr", &self.addr)
            .field("token", &"[REDACTED]")
            .field("transit_mount", &self.transit_mount)
            .field("client_timeout", &self.client_timeout)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<(), CipherError> {
    if value.trim().is_empty() {
        return Err(CipherError::Config(format!(
            "{name} is required and must not be empty"
        )));
    }
    Ok(())
}
