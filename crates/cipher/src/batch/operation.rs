//! The two directions of a batch call.
//!
//! Each direction knows its endpoint, how to turn one field into a
//! [`BatchItem`], and how to turn one typed batch result back into the field
//! name and the value to store. Everything else is shared by the client.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{
    protocol::{BatchItem, DecryptResult, EncryptResult},
    CipherError,
};
use serde::de::DeserializeOwned;

/// One direction of a batch call.
pub(crate) trait Operation {
    /// Endpoint under the transit mount, e.g. `encrypt`.
    const VERB: &'static str;

    /// Shape of one entry of `batch_results`.
    type Result: DeserializeOwned;

    /// Build the batch item for `field` holding `value`.
    fn item(field: &str, value: &str) -> BatchItem;

    /// Validate one batch result and return `(field name, new value)`.
    fn resolve(result: Self::Result) -> Result<(String, String), CipherError>;
}

/// Plaintext fields in, ciphertext out.
pub(crate) struct Encrypt;

/// Ciphertext fields in, plaintext out.
pub(crate) struct Decrypt;

impl Operation for Encrypt {
    const VERB: &'static str = "encrypt";
    type Result = EncryptResult;

    fn item(field: &str, value: &str) -> BatchItem {
        BatchItem::Encrypt {
            plaintext: STANDARD.encode(value),
            reference: STANDARD.encode(field),
        }
    }

    fn resolve(result: EncryptResult) -> Result<(String, String), CipherError> {
        // The reference was sent as bytes, so it comes back base64-encoded.
        let field = decode_text(&result.reference, "reference")?;
        reject_item_error(&field, result.error)?;
        let ciphertext = result.ciphertext.ok_or_else(|| {
            CipherError::ResponseFormat(format!("batch result for `{field}` has no ciphertext"))
        })?;
        Ok((field, ciphertext))
    }
}

impl Operation for Decrypt {
    const VERB: &'static str = "decrypt";
    type Result = DecryptResult;

    fn item(field: &str, value: &str) -> BatchItem {
        BatchItem::Decrypt {
            ciphertext: value.to_owned(),
            reference: field.to_owned(),
        }
    }

    fn resolve(result: DecryptResult) -> Result<(String, String), CipherError> {
        let field = result.reference;
        reject_item_error(&field, result.error)?;
        let plaintext = result.plaintext.ok_or_else(|| {
            CipherError::ResponseFormat(format!("batch result for `{field}` has no plaintext"))
        })?;
        let plaintext = decode_text(&plaintext, "plaintext")?;
        Ok((field, plaintext))
    }
}

fn reject_item_error(field: &str, error: Option<String>) -> Result<(), CipherError> {
    match error {
        Some(e) if !e.is_empty() => Err(CipherError::ResponseFormat(format!(
            "service rejected field `{field}`: {e}"
        ))),
        _ => Ok(()),
    }
}

/// Decode a base64 value that must hold UTF-8 text.
fn decode_text(encoded: &str, what: &str) -> Result<String, CipherError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| CipherError::ResponseFormat(format!("{what} is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| CipherError::ResponseFormat(format!("{what} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_item_encodes_value_and_reference() {
        let item = Encrypt::item("name", "John Doe");
        assert_eq!(
            item,
            BatchItem::Encrypt {
                plaintext: "Sm9obiBEb2U=".into(),
                reference: "bmFtZQ==".into(),
            }
        );
    }

    #[test]
    fn decrypt_item_is_raw() {
        let item = Decrypt::item("name", "vault:v1:abc");
        assert_eq!(
            item,
            BatchItem::Decrypt {
                ciphertext: "vault:v1:abc".into(),
                reference: "name".into(),
            }
        );
    }

    #[test]
    fn encrypt_resolve_decodes_reference() {
        let (field, value) = Encrypt::resolve(EncryptResult {
            reference: "bmFtZQ==".into(),
            ciphertext: Some("vault:v1:abc".into()),
            error: None,
        })
        .unwrap();
        assert_eq!(field, "name");
        assert_eq!(value, "vault:v1:abc");
    }

    #[test]
    fn decrypt_resolve_decodes_plaintext() {
        let (field, value) = Decrypt::resolve(DecryptResult {
            reference: "name".into(),
            plaintext: Some("Sm9obiBEb2U=".into()),
            error: None,
        })
        .unwrap();
        assert_eq!(field, "name");
        assert_eq!(value, "John Doe");
    }

    #[test]
    fn undecodable_reference_is_format_error() {
        let err = Encrypt::resolve(EncryptResult {
            reference: "not base64!".into(),
            ciphertext: Some("c".into()),
            error: None,
        })
        .unwrap_err();
        assert!(matches!(err, CipherError::ResponseFormat(_)));
    }

    #[test]
    fn non_utf8_plaintext_is_format_error() {
        let err = Decrypt::resolve(DecryptResult {
            reference: "name".into(),
            plaintext: Some(STANDARD.encode([0xffu8, 0xfe])),
            error: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn missing_output_is_format_error() {
        let err = Encrypt::resolve(EncryptResult {
            reference: "bmFtZQ==".into(),
            ciphertext: None,
            error: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("no ciphertext"));
    }

    #[test]
    fn item_error_names_the_field() {
        let err = Decrypt::resolve(DecryptResult {
            reference: "name".into(),
            plaintext: None,
            error: Some("cipher: message authentication failed".into()),
        })
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`name`"), "{msg}");
        assert!(msg.contains("authentication failed"), "{msg}");
    }

    #[test]
    fn empty_item_error_is_ignored() {
        assert!(Decrypt::resolve(DecryptResult {
            reference: "name".into(),
            plaintext: Some(String::new()),
            error: Some(String::new()),
        })
        .is_ok());
    }
}
