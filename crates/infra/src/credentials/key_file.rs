use std::fs;
use std::path::Path;

use calnow_common::crypto::KEY_LENGTH;
use calnow_common::{restrict_to_owner, write_private, EncryptionService};
use tracing::{info, warn};

use super::StoreError;

/// Load the installation key, generating and persisting one on first use.
///
/// An existing key is never rotated. Loose permissions on an existing key
/// file are tightened in place.
pub fn load_or_create_key(path: &Path) -> Result<Vec<u8>, StoreError> {
    if path.exists() {
        let key = fs::read(path)?;
        if key.len() != KEY_LENGTH {
            return Err(StoreError::InvalidKeyLength(key.len()));
        }
        if let Err(err) = restrict_to_owner(path) {
            warn!(error = %err, "could not restrict key file permissions");
        }
        return Ok(key);
    }

    let key = EncryptionService::generate_key();
    write_private(path, &key)?;
    info!(path = %path.display(), "generated new encryption key");
    Ok(key)
}
