//! Request and response bodies exchanged with a transit encryption service.
//!
//! Requests are written to `<mount>/encrypt/<key>` or `<mount>/decrypt/<key>`.
//! Both directions share the same envelope and differ only in the shape of a
//! single batch item and a single batch result.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of a batch encrypt or decrypt write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// One item per eligible field, in field declaration order.
    pub batch_input: Vec<BatchItem>,
}

/// One unit of a batch request.
///
/// Serialised without a tag: the service tells the two shapes apart by the
/// endpoint they are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    /// Plaintext to encrypt. Both values are base64-encoded bytes.
    Encrypt {
        /// base64 of the field value.
        plaintext: String,
        /// base64 of the field name.
        reference: String,
    },
    /// Ciphertext to decrypt. Both values are sent as is.
    Decrypt {
        /// Ciphertext previously returned by the service.
        ciphertext: String,
        /// Field name.
        reference: String,
    },
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Outer response envelope; the service nests its payload under `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response<T> {
    /// Operation payload. Absent on some empty responses.
    pub data: Option<T>,
}

/// Payload of a batch response.
///
/// Entries are kept as raw JSON so that one malformed entry can be reported
/// on its own instead of failing the whole body.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOutput {
    /// One entry per processed batch item, in any order.
    #[serde(default)]
    pub batch_results: Option<Vec<serde_json::Value>>,
}

/// One entry of an encrypt batch response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncryptResult {
    /// Echo of the request reference (still base64).
    pub reference: String,
    /// Opaque ciphertext, e.g. `vault:v1:...`.
    #[serde(default)]
    pub ciphertext: Option<String>,
    /// Per-item failure reported by the service.
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry of a decrypt batch response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecryptResult {
    /// Echo of the request reference.
    pub reference: String,
    /// base64 of the recovered plaintext bytes.
    #[serde(default)]
    pub plaintext: Option<String>,
    /// Per-item failure reported by the service.
    #[serde(default)]
    pub error: Option<String>,
}

/// Error body returned by the service on non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error messages.
    #[serde(default)]
    pub errors: Vec<String>,
}
