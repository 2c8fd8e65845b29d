//! Configuration loading and validation for the smoke check.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which transit service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A Vault-compatible service configured through `VAULT_*` variables.
    Vault,
    /// The in-process engine; needs no running service.
    Local,
}

/// Validated smoke check configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend to run against.
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Name of the transit key used for the round trip.
    #[serde(default = "default_key_name")]
    pub key_name: String,

    /// Enable the transit engine before running (fresh dev servers only).
    #[serde(default)]
    pub mount_transit: bool,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_backend() -> Backend {
    Backend::Vault
}
fn default_key_name() -> String {
    "my-encryption-key".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `SMOKE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("SMOKE"))
            .build()
            .context("failed to build smoke configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise smoke configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.key_name.trim().is_empty() {
            anyhow::bail!("SMOKE_KEY_NAME must not be empty");
        }
        if self.mount_transit && self.backend == Backend::Local {
            anyhow::bail!("SMOKE_MOUNT_TRANSIT only applies to the vault backend");
        }
        Ok(())
    }
}
