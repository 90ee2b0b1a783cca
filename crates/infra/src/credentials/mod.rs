//! Encrypted credential persistence
//!
//! The credential document is encrypted with a per-installation key kept in
//! the data directory next to it. Both files are owner-only.

mod key_file;
pub mod store;

use calnow_common::CommonError;
use calnow_domain::CalNowError;
use thiserror::Error;

pub use key_file::load_or_create_key;
pub use store::CredentialStore;

/// Why a credential or registration could not be read or written.
///
/// Stays inside the store: public operations log it and report a plain
/// success flag or absence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("key file holds {0} bytes, expected 32")]
    InvalidKeyLength(usize),

    #[error("client registration rejected: {0}")]
    Registration(#[from] CalNowError),
}
