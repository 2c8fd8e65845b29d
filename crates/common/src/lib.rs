//! Common types, wire definitions, and errors shared across `transit-cipher` crates.

pub mod error;
pub mod protocol;

pub use error::{CipherError, TransportError};
