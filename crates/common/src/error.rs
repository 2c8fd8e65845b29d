//! Error kinds returned by field encryption and decryption.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for every encrypt/decrypt call.
///
/// Every variant is returned to the immediate caller; nothing is logged or
/// swallowed on the way out.
/// - [`CipherError::Config`] → caller supplied an empty or unusable key name or setting
/// - [`CipherError::InvalidInput`] → the record does not honour its own field declarations
/// - [`CipherError::Transport`] → the remote call failed, propagated unchanged
/// - [`CipherError::ResponseFormat`] → the service answered with something we cannot map back
#[derive(Debug, Error)]
pub enum CipherError {
    /// Empty or invalid key name, or invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The target record cannot be read or written as declared.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The remote service call itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response is missing `batch_results`, or an entry is malformed.
    #[error("malformed response: {0}")]
    ResponseFormat(String),
}

impl CipherError {
    /// Returns a short, stable, machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            CipherError::Config(_) => "config_error",
            CipherError::InvalidInput(_) => "invalid_input",
            CipherError::Transport(_) => "transport_error",
            CipherError::ResponseFormat(_) => "response_format_error",
        }
    }
}

/// Failures of the remote write itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built, sent, or its connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {}", .errors.join("; "))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error messages reported by the service, if any.
        errors: Vec<String>,
    },

    /// No response arrived within the configured client timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be read or is not JSON.
    #[error("unreadable response body: {0}")]
    Body(String),
}
