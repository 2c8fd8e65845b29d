//! Transparent field-level encryption of records through a transit-style
//! encryption service.
//!
//! A record declares which of its top-level `String` fields are sensitive
//! (usually with `#[derive(Record)]` and `#[encrypted]`). [`Client::encrypt`]
//! and [`Client::decrypt`] then rewrite exactly those fields in place with a
//! single batch call to the service per invocation.
//!
//! ```ignore
//! use transit_cipher::{Client, Record};
//!
//! #[derive(Record)]
//! struct Person {
//!     #[encrypted]
//!     name: String,
//!     desc: String,
//! }
//!
//! let client = Client::with_token("root-token", "http://127.0.0.1:8200")?;
//! let mut p = Person { name: "John Doe".into(), desc: "abc".into() };
//! client.encrypt(&mut p, "my-encryption-key").await?;
//! client.decrypt(&mut p, "my-encryption-key").await?;
//! ```

// Lets `#[derive(Record)]` output (which names `::transit_cipher`) resolve
// inside this crate's own tests.
extern crate self as transit_cipher;

pub mod batch;
pub mod config;
pub mod record;
pub mod transit;

pub use batch::Client;
pub use common::{CipherError, TransportError};
pub use config::TransitConfig;
pub use record::{select_encrypted_fields, FieldDescriptor, FieldType, Record};
#[cfg(any(test, feature = "testing"))]
pub use transit::LocalTransit;
pub use transit::{Transit, VaultTransit};
pub use transit_cipher_derive::Record;
