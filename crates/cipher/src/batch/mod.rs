//! Batch encryption and decryption of a record's sensitive fields.
//!
//! # Flow
//!
//! 1. Validate the key name.
//! 2. Select the eligible fields of the record type. None selected: return.
//! 3. Build one batch item per field, in declaration order, each carrying the
//!    field name as its reference.
//! 4. Issue exactly one write to `<mount>/<encrypt|decrypt>/<key>`.
//! 5. Decode `batch_results` and write every value back onto the field its
//!    reference names. Position in the response is never used.
//!
//! A malformed entry aborts the call. Fields written before it keep their new
//! values; there is no rollback. Entries missing from a short response leave
//! their fields untouched.

mod operation;

use std::{any::type_name, collections::HashSet};

use common::{
    protocol::{BatchOutput, BatchRequest, Response},
    CipherError,
};
use serde_json::Value;
use tracing::debug;

use crate::config::TransitConfig;
use crate::record::{select_encrypted_fields, Record};
use crate::transit::{Transit, VaultTransit};
use operation::{Decrypt, Encrypt, Operation};

/// Mount path used when none is configured.
const DEFAULT_MOUNT: &str = "transit";

/// Encrypts and decrypts record fields through a [`Transit`] service.
///
/// Holds no state besides the transport handle, so one client can serve any
/// number of concurrent calls on independent records.
#[derive(Debug, Clone)]
pub struct Client<T = VaultTransit> {
    transit: T,
    mount: String,
}

impl Client<VaultTransit> {
    /// Connect to the service at `addr` with `token`, using the `transit` mount.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Config`] if `addr` is not a usable URL.
    pub fn with_token(token: impl Into<String>, addr: &str) -> Result<Self, CipherError> {
        Ok(Self::new(VaultTransit::with_token(token, addr)?))
    }

    /// Connect using a [`TransitConfig`], honouring its mount and timeout.
    pub fn from_config(cfg: &TransitConfig) -> Result<Self, CipherError> {
        Ok(Self::new(VaultTransit::from_config(cfg)?).with_mount(cfg.mount()))
    }
}

impl<T: Transit> Client<T> {
    /// Wrap an existing transport, using the `transit` mount.
    pub fn new(transit: T) -> Self {
        Self {
            transit,
            mount: DEFAULT_MOUNT.to_owned(),
        }
    }

    /// Address the transit engine mounted at `mount` instead.
    pub fn with_mount(mut self, mount: &str) -> Self {
        self.mount = mount.trim_matches('/').to_owned();
        self
    }

    /// The underlying transport.
    pub fn transit(&self) -> &T {
        &self.transit
    }

    /// Encrypt every sensitive string field of `record` in place with `key_name`.
    ///
    /// # Errors
    ///
    /// - [`CipherError::Config`] if `key_name` is empty or not a plain key name.
    /// - [`CipherError::InvalidInput`] if `record` does not expose a field it declares.
    /// - [`CipherError::Transport`] if the service call fails.
    /// - [`CipherError::ResponseFormat`] if the response cannot be mapped back.
    pub async fn encrypt<R: Record>(&self, record: &mut R, key_name: &str) -> Result<(), CipherError> {
        self.apply::<Encrypt, R>(record, key_name).await
    }

    /// Decrypt every sensitive string field of `record` in place with `key_name`.
    ///
    /// Fails exactly like [`Client::encrypt`].
    pub async fn decrypt<R: Record>(&self, record: &mut R, key_name: &str) -> Result<(), CipherError> {
        self.apply::<Decrypt, R>(record, key_name).await
    }

    async fn apply<O: Operation, R: Record>(
        &self,
        record: &mut R,
        key_name: &str,
    ) -> Result<(), CipherError> {
        validate_key_name(key_name)?;

        let fields = select_encrypted_fields::<R>();
        if fields.is_empty() {
            debug!(record = type_name::<R>(), "no encrypted fields; nothing to do");
            return Ok(());
        }

        let mut names = HashSet::with_capacity(fields.len());
        let mut batch_input = Vec::with_capacity(fields.len());
        for field in &fields {
            if !names.insert(field.name) {
                return Err(CipherError::InvalidInput(format!(
                    "field `{}` is declared more than once",
                    field.name
                )));
            }
            let value = record.string_field(field.name).ok_or_else(|| {
                CipherError::InvalidInput(format!(
                    "record does not expose string field `{}`",
                    field.name
                ))
            })?;
            batch_input.push(O::item(field.name, value));
        }

        let body = serde_json::to_value(BatchRequest { batch_input }).map_err(|e| {
            CipherError::InvalidInput(format!("failed to encode batch request: {e}"))
        })?;
        let path = format!("{}/{}/{key_name}", self.mount, O::VERB);
        debug!(
            path = %path,
            record = type_name::<R>(),
            fields = fields.len(),
            "issuing batch request"
        );

        let response = self.transit.write(&path, body).await?;
        let results = batch_results(response)?;
        if results.len() > fields.len() {
            return Err(CipherError::ResponseFormat(format!(
                "{} batch results for {} requested fields",
                results.len(),
                fields.len()
            )));
        }

        let mut applied = HashSet::with_capacity(results.len());
        for entry in results {
            let result: O::Result = serde_json::from_value(entry)
                .map_err(|e| CipherError::ResponseFormat(format!("invalid batch result: {e}")))?;
            let (name, value) = O::resolve(result)?;

            if !names.contains(name.as_str()) {
                return Err(CipherError::ResponseFormat(format!(
                    "batch result references unknown field `{name}`"
                )));
            }
            if applied.contains(&name) {
                return Err(CipherError::ResponseFormat(format!(
                    "duplicate batch result for field `{name}`"
                )));
            }
            let slot = record.string_field_mut(&name).ok_or_else(|| {
                CipherError::InvalidInput(format!("record does not expose string field `{name}`"))
            })?;
            *slot = value;
            applied.insert(name);
        }

        debug!(
            record = type_name::<R>(),
            applied = applied.len(),
            "batch results applied"
        );
        Ok(())
    }
}

/// Reject key names that are empty or could change the request path.
///
/// Only ASCII letters, digits, `_`, `-` and `.` are accepted. `%` is excluded
/// because the service decodes escapes like `%2F` before routing.
fn validate_key_name(key_name: &str) -> Result<(), CipherError> {
    if key_name.is_empty() {
        return Err(CipherError::Config("encryption key is empty".into()));
    }
    if matches!(key_name, "." | "..")
        || !key_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
    {
        return Err(CipherError::Config(format!(
            "invalid encryption key name {key_name:?}"
        )));
    }
    Ok(())
}

/// Extract `data.batch_results` from a response body.
fn batch_results(response: Option<Value>) -> Result<Vec<Value>, CipherError> {
    let body = response.ok_or_else(|| {
        CipherError::ResponseFormat("empty response from transit service".into())
    })?;
    let parsed: Response<BatchOutput> = serde_json::from_value(body)
        .map_err(|e| CipherError::ResponseFormat(format!("invalid response body: {e}")))?;
    parsed
        .data
        .and_then(|d| d.batch_results)
        .ok_or_else(|| {
            CipherError::ResponseFormat("batch_results not found in the response data".into())
        })
}
