//! Shared cryptographic primitives.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService, KEY_LENGTH};
