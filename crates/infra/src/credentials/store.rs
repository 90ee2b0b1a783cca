//! Credential and client registration storage
//!
//! `credentials.json` holds `{"encrypted_credentials": "<ciphertext>"}`. The
//! ciphertext is the serialized [`Credential`] encrypted under the
//! installation key (`.key`).
//!
//! A credential that cannot be read for any reason (missing file, missing or
//! different key, tampered ciphertext, unparsable document) is reported as
//! absent. Callers cannot tell "never signed in" from "store corrupted".

use std::fs;
use std::path::{Path, PathBuf};

use calnow_common::{write_private, EncryptionService};
use calnow_domain::{CalNowError, ClientConfigDocument, ClientRegistration, Credential, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::key_file::load_or_create_key;
use super::StoreError;
use crate::config::AppPaths;

/// On-disk envelope of the encrypted credential.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialDocument {
    encrypted_credentials: String,
}

/// File-backed store for the credential and the client registration.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    paths: AppPaths,
}

impl CredentialStore {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Encrypt and persist `credential`, replacing any stored one.
    ///
    /// Returns `false` on any failure; the cause is logged.
    pub fn save_credential(&self, credential: &Credential) -> bool {
        match self.write_credential(credential) {
            Ok(()) => {
                info!(client_id = %credential.client_id, "credentials saved");
                true
            }
            Err(err) => {
                error!(error = %err, "failed to save credentials");
                false
            }
        }
    }

    /// Load and decrypt the stored credential.
    pub fn load_credential(&self) -> Option<Credential> {
        let path = self.paths.credentials_file();
        if !path.exists() {
            debug!("no stored credentials");
            return None;
        }

        match self.read_credential(&path) {
            Ok(credential) => Some(credential),
            Err(err) => {
                warn!(error = %err, "stored credentials unreadable; treating as absent");
                None
            }
        }
    }

    /// Whether a credential can be loaded. Expiry is not checked.
    pub fn has_valid_credential(&self) -> bool {
        self.load_credential().is_some()
    }

    /// Remove the stored credential. Succeeds if it is already gone.
    pub fn delete_credential(&self) -> bool {
        let path = self.paths.credentials_file();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("credentials deleted");
                true
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
            Err(err) => {
                error!(error = %err, path = %path.display(), "failed to delete credentials");
                false
            }
        }
    }

    /// Resolve the client registration document.
    ///
    /// Candidates are tried in order: next to the executable, the bundled
    /// resource, the per-user file. The first one that exists and yields a
    /// registration wins.
    pub fn get_client_config_document(&self) -> Option<(PathBuf, ClientConfigDocument)> {
        for candidate in self.paths.client_config_candidates() {
            if !candidate.exists() {
                continue;
            }

            match read_client_config(&candidate) {
                Ok(document) => {
                    debug!(path = %candidate.display(), "client configuration resolved");
                    return Some((candidate, document));
                }
                Err(err) => {
                    warn!(path = %candidate.display(), error = %err, "skipping client configuration");
                }
            }
        }

        None
    }

    /// Resolve and normalize the client registration.
    pub fn get_client_registration(&self) -> Option<ClientRegistration> {
        self.get_client_config_document().and_then(|(_, document)| document.registration().ok())
    }

    /// Whether a registration with a `web` or `installed` section resolves.
    pub fn has_client_registration(&self) -> bool {
        self.get_client_config_document().is_some_and(|(_, document)| document.has_client_section())
    }

    /// Persist a client registration document to the per-user location.
    pub fn save_client_registration(&self, document: &ClientConfigDocument) -> bool {
        let path = self.paths.client_config_file();
        let result = serde_json::to_vec_pretty(document)
            .map_err(StoreError::from)
            .and_then(|bytes| write_private(&path, &bytes).map_err(StoreError::from));

        match result {
            Ok(()) => {
                info!(path = %path.display(), "client configuration saved");
                true
            }
            Err(err) => {
                error!(error = %err, "failed to save client configuration");
                false
            }
        }
    }

    /// Import a client secrets file downloaded from the provider console.
    ///
    /// # Errors
    /// Returns `CalNowError::InvalidInput` if the file is not a client
    /// secrets document, `CalNowError::Config` if it has no usable section,
    /// or `CalNowError::Io` if it cannot be read or saved.
    pub fn import_client_registration(&self, path: &Path) -> Result<ClientRegistration> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CalNowError::Io(format!("cannot read {}: {e}", path.display())))?;
        let document = ClientConfigDocument::from_json(&contents)?;
        let registration = document.registration()?;

        if !self.save_client_registration(&document) {
            return Err(CalNowError::Io("failed to save client configuration".to_string()));
        }

        Ok(registration)
    }

    fn write_credential(&self, credential: &Credential) -> std::result::Result<(), StoreError> {
        let key = load_or_create_key(&self.paths.key_file())?;
        let service = EncryptionService::new(key)?;

        let plaintext = serde_json::to_vec(credential)?;
        let document =
            CredentialDocument { encrypted_credentials: service.encrypt_to_string(&plaintext)? };

        write_private(&self.paths.credentials_file(), &serde_json::to_vec_pretty(&document)?)?;
        Ok(())
    }

    fn read_credential(&self, path: &Path) -> std::result::Result<Credential, StoreError> {
        let document: CredentialDocument = serde_json::from_slice(&fs::read(path)?)?;
        let key = load_or_create_key(&self.paths.key_file())?;
        let service = EncryptionService::new(key)?;

        let plaintext = service.decrypt_from_string(&document.encrypted_credentials)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

fn read_client_config(path: &Path) -> std::result::Result<ClientConfigDocument, StoreError> {
    let document = ClientConfigDocument::from_json(&fs::read_to_string(path)?)?;
    document.registration()?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use calnow_common::is_owner_only;
    use calnow_domain::RegistrationKind;
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, CredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(AppPaths::rooted_at(dir.path()));
        (dir, store)
    }

    fn credential() -> Credential {
        let registration = ClientConfigDocument::web("client-id", "client-secret")
            .unwrap()
            .registration()
            .unwrap();
        Credential::issued(&registration, "access-token")
            .with_refresh_token(Some("refresh-token".into()))
            .with_scopes(["scope-a", "scope-b"])
            .with_expires_in(Some(3600))
    }

    fn write_config(path: &Path, client_id: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(r#"{{"installed": {{"client_id": "{client_id}", "client_secret": "s"}}}}"#),
        )
        .unwrap();
    }

    #[test]
    fn saved_credential_loads_back_identically() {
        let (_dir, store) = store();
        let original = credential();

        assert!(store.save_credential(&original));
        assert_eq!(store.load_credential(), Some(original));
        assert!(store.has_valid_credential());
    }

    #[test]
    fn credential_file_is_encrypted_and_owner_only() {
        let (_dir, store) = store();
        assert!(store.save_credential(&credential()));

        let path = store.paths().credentials_file();
        let raw = fs::read_to_string(&path).unwrap();
        let document: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(document["encrypted_credentials"].is_string());
        assert!(!raw.contains("access-token"));
        assert!(is_owner_only(&path).unwrap());
        assert!(is_owner_only(&store.paths().key_file()).unwrap());
    }

    #[test]
    fn missing_store_is_absent() {
        let (_dir, store) = store();
        assert_eq!(store.load_credential(), None);
        assert!(!store.has_valid_credential());
        assert!(!store.paths().key_file().exists(), "reading must not create a key");
    }

    #[test]
    fn lost_key_degrades_to_absent() {
        let (_dir, store) = store();
        assert!(store.save_credential(&credential()));

        fs::remove_file(store.paths().key_file()).unwrap();

        assert_eq!(store.load_credential(), None);
    }

    #[test]
    fn corrupted_document_degrades_to_absent() {
        let (_dir, store) = store();
        assert!(store.save_credential(&credential()));

        fs::write(store.paths().credentials_file(), r#"{"encrypted_credentials": "garbage"}"#)
            .unwrap();
        assert_eq!(store.load_credential(), None);

        fs::write(store.paths().credentials_file(), "not json").unwrap();
        assert_eq!(store.load_credential(), None);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, store) = store();
        assert!(store.save_credential(&credential()));

        assert!(store.delete_credential());
        assert!(!store.paths().credentials_file().exists());
        assert!(store.delete_credential());
    }

    #[test]
    fn registration_resolution_prefers_install_dir() {
        let (_dir, store) = store();
        let paths = store.paths().clone();

        write_config(&paths.client_config_file(), "user-id");
        assert_eq!(store.get_client_registration().unwrap().client_id, "user-id");

        write_config(&paths.bundled_client_config(), "bundled-id");
        assert_eq!(store.get_client_registration().unwrap().client_id, "bundled-id");

        write_config(&paths.installed_client_config(), "installed-id");
        let (path, _) = store.get_client_config_document().unwrap();
        assert_eq!(path, paths.installed_client_config());
        assert_eq!(store.get_client_registration().unwrap().client_id, "installed-id");
    }

    #[test]
    fn unparsable_candidate_falls_through() {
        let (_dir, store) = store();
        let paths = store.paths().clone();

        fs::create_dir_all(paths.install_dir()).unwrap();
        fs::write(paths.installed_client_config(), "{ broken").unwrap();
        write_config(&paths.client_config_file(), "user-id");

        assert_eq!(store.get_client_registration().unwrap().client_id, "user-id");
    }

    #[test]
    fn missing_registration_is_reported() {
        let (_dir, store) = store();
        assert!(store.get_client_registration().is_none());
        assert!(!store.has_client_registration());
    }

    #[test]
    fn saved_web_registration_resolves() {
        let (_dir, store) = store();
        let document = ClientConfigDocument::web("typed-id", "typed-secret").unwrap();

        assert!(store.save_client_registration(&document));
        assert!(store.has_client_registration());
        assert!(is_owner_only(&store.paths().client_config_file()).unwrap());

        let registration = store.get_client_registration().unwrap();
        assert_eq!(registration.kind, RegistrationKind::Web);
        assert_eq!(registration.client_secret, "typed-secret");
    }

    #[test]
    fn import_validates_before_saving() {
        let (dir, store) = store();
        let download = dir.path().join("client_secret_123.json");

        fs::write(&download, "{}").unwrap();
        assert!(matches!(
            store.import_client_registration(&download),
            Err(CalNowError::Config(_))
        ));
        assert!(!store.paths().client_config_file().exists());

        write_config(&download, "downloaded-id");
        let registration = store.import_client_registration(&download).unwrap();
        assert_eq!(registration.client_id, "downloaded-id");
        assert!(store.has_client_registration());
    }
}
