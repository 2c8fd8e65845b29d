//! [`LocalTransit`]: an in-process transit engine for tests and local runs.
//!
//! Speaks the same batch wire shapes as the real service so that the batch
//! operator cannot tell the difference. Not a key management system: keys
//! live in memory and vanish with the value.
//!
//! Ciphertexts are `vault:v1:<base64(nonce || ciphertext+tag)>`, produced by
//! AES-256-GCM-SIV under a per-key subkey `HMAC-SHA256(master, key_name)`.

use std::sync::atomic::{AtomicUsize, Ordering};

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::TransportError;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

use super::Transit;

/// Byte length of an AES-256 key.
const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce.
const NONCE_LEN: usize = 12;

/// Prefix of every ciphertext this engine emits.
const CIPHERTEXT_PREFIX: &str = "vault:v1:";

/// In-memory transit engine mounted at a single path (default `transit`).
pub struct LocalTransit {
    mount: String,
    master: [u8; KEY_LEN],
    writes: AtomicUsize,
}

impl LocalTransit {
    /// A fresh engine mounted at `transit` with a random master key.
    pub fn new() -> Self {
        Self::with_mount("transit")
    }

    /// A fresh engine mounted at `mount`.
    pub fn with_mount(mount: &str) -> Self {
        let mut master = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut master);
        Self {
            mount: mount.trim_matches('/').to_owned(),
            master,
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of writes received so far, successful or not.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn cipher(&self, key_name: &str) -> Result<Aes256GcmSiv, String> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.master)
            .map_err(|_| "invalid master key".to_string())?;
        mac.update(key_name.as_bytes());
        let subkey = mac.finalize().into_bytes();
        Aes256GcmSiv::new_from_slice(&subkey).map_err(|_| "invalid key length".to_string())
    }

    fn encrypt_one(&self, cipher: &Aes256GcmSiv, item: &Value) -> Value {
        let reference = item["reference"].clone();
        let result = item["plaintext"]
            .as_str()
            .ok_or_else(|| "missing plaintext in batch item".to_string())
            .and_then(|p| {
                STANDARD
                    .decode(p)
                    .map_err(|_| "plaintext is not valid base64".to_string())
            })
            .and_then(|plaintext| {
                let mut nonce = [0u8; NONCE_LEN];
                OsRng.fill_bytes(&mut nonce);
                let sealed = cipher
                    .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
                    .map_err(|_| "encryption failed".to_string())?;
                let mut blob = nonce.to_vec();
                blob.extend_from_slice(&sealed);
                Ok(format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(blob)))
            });
        match result {
            Ok(ciphertext) => {
                json!({"ciphertext": ciphertext, "key_version": 1, "reference": reference})
            }
            Err(error) => json!({"error": error, "reference": reference}),
        }
    }

    fn decrypt_one(&self, cipher: &Aes256GcmSiv, item: &Value) -> Value {
        let reference = item["reference"].clone();
        let result = item["ciphertext"]
            .as_str()
            .and_then(|c| c.strip_prefix(CIPHERTEXT_PREFIX))
            .and_then(|c| STANDARD.decode(c).ok())
            .filter(|blob| blob.len() > NONCE_LEN)
            .ok_or_else(|| "invalid ciphertext: unsupported format".to_string())
            .and_then(|blob| {
                let (nonce, sealed) = blob.split_at(NONCE_LEN);
                cipher
                    .decrypt(Nonce::from_slice(nonce), sealed)
                    .map_err(|_| "cipher: message authentication failed".to_string())
            });
        match result {
            Ok(plaintext) => json!({"plaintext": STANDARD.encode(plaintext), "reference": reference}),
            Err(error) => json!({"error": error, "reference": reference}),
        }
    }
}

impl Default for LocalTransit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transit for LocalTransit {
    async fn write(&self, path: &str, body: Value) -> Result<Option<Value>, TransportError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let not_found = || TransportError::Status {
            status: 404,
            errors: vec![format!("no handler for route \"{path}\"")],
        };
        let rest = path
            .trim_start_matches('/')
            .strip_prefix(self.mount.as_str())
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(not_found)?;
        let (op, key_name) = rest.split_once('/').ok_or_else(not_found)?;
        if key_name.is_empty() || key_name.contains('/') {
            return Err(not_found());
        }

        let items = body["batch_input"]
            .as_array()
            .ok_or_else(|| TransportError::Status {
                status: 400,
                errors: vec!["missing batch_input".into()],
            })?;
        let cipher = self.cipher(key_name).map_err(|e| TransportError::Status {
            status: 500,
            errors: vec![e],
        })?;

        let results: Vec<Value> = match op {
            "encrypt" => items.iter().map(|i| self.encrypt_one(&cipher, i)).collect(),
            "decrypt" => items.iter().map(|i| self.decrypt_one(&cipher, i)).collect(),
            _ => return Err(not_found()),
        };
        Ok(Some(json!({"data": {"batch_results": results}})))
    }
}
