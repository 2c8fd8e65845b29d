//! The remote transit encryption service, as seen by the batch operator.
//!
//! # Responsibilities
//!
//! - [`Transit`]: the single "logical write" operation the operator needs.
//! - [`VaultTransit`]: HTTP(S) implementation against a Vault-compatible API.
//! - `LocalTransit` (feature `testing`): in-process stand-in used by tests.
//!
//! # Module invariants
//!
//! - **No record knowledge.** Transports move JSON bodies; they never see
//!   field names except as opaque request content.
//! - **No retries.** A failed write is reported once, as is.

#[cfg(any(test, feature = "testing"))]
pub mod local;
pub mod vault;

#[cfg(any(test, feature = "testing"))]
pub use local::LocalTransit;
pub use vault::VaultTransit;

use async_trait::async_trait;
use common::TransportError;

/// A handle to a transit-style encryption service.
///
/// Implementations must be safe to share between concurrent calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transit: Send + Sync {
    /// Write `body` to the logical `path` (e.g. `transit/encrypt/my-key`) and
    /// return the parsed response body, or `None` when the service sent none.
    async fn write(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, TransportError>;
}
