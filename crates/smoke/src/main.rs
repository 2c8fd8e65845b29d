//! `transit-smoke` — round-trips a sample record through a transit service.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`](crate::config::Config) from `SMOKE_*` environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Build a client for the selected backend (`VAULT_*` settings for `vault`).
//! 4. Encrypt, verify, decrypt, verify. Exit non-zero on any mismatch.

mod check;
mod config;
mod telemetry;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};
use transit_cipher::{Client, LocalTransit, Transit, TransitConfig, VaultTransit};

use crate::config::Backend;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = crate::config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: transit-smoke configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?cfg.backend,
        "transit-smoke starting"
    );

    // -----------------------------------------------------------------------
    // 3. Client + 4. Round trip
    // -----------------------------------------------------------------------
    match cfg.backend {
        Backend::Vault => {
            let transit_cfg =
                TransitConfig::from_env().context("invalid VAULT_* configuration")?;
            let transit = VaultTransit::from_config(&transit_cfg)?;
            if cfg.mount_transit {
                mount_transit(&transit, transit_cfg.mount()).await;
            }
            let client = Client::new(transit).with_mount(transit_cfg.mount());
            check::round_trip(&client, &cfg.key_name).await
        }
        Backend::Local => {
            let client = Client::new(LocalTransit::new());
            check::round_trip(&client, &cfg.key_name).await
        }
    }
}

/// Enable a transit engine at `mount`. An engine that is already mounted makes
/// the service reject the request; that is reported and otherwise ignored.
async fn mount_transit<T: Transit>(transit: &T, mount: &str) {
    let path = format!("sys/mounts/{mount}");
    match transit.write(&path, json!({"type": "transit"})).await {
        Ok(_) => info!(mount, "transit engine mounted"),
        Err(e) => warn!(mount, error = %e, "could not mount transit engine; continuing"),
    }
}
