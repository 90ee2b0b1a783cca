//! Sign-out: best-effort remote revocation, then unconditional local
//! deletion.

use calnow_domain::AuthFailure;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::http::HttpClient;
use crate::observability::redact;

pub struct RevocationManager {
    store: CredentialStore,
    http: HttpClient,
    endpoint: String,
}

impl RevocationManager {
    pub fn new(store: CredentialStore, http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self { store, http, endpoint: endpoint.into() }
    }

    /// Revoke the stored token with the provider and delete it locally.
    ///
    /// The remote call may fail without consequence; the return value
    /// reflects only the local deletion.
    pub async fn revoke(&self) -> bool {
        if let Some(credential) = self.store.load_credential() {
            match self.revoke_remote(&credential.access_token).await {
                Ok(()) => info!("token revoked with provider"),
                Err(failure) => warn!(error = %failure, "ignoring revocation failure"),
            }
        }

        self.store.delete_credential()
    }

    async fn revoke_remote(&self, token: &str) -> Result<(), AuthFailure> {
        tracing::debug!(token = %redact(token), "revoking token");

        let reply = self
            .http
            .post_form(&self.endpoint, &[("token", token)])
            .await
            .map_err(|e| AuthFailure::RevocationNetworkFailure(e.to_string()))?;

        if reply.is_success() {
            Ok(())
        } else {
            Err(AuthFailure::RevocationNetworkFailure(format!(
                "revocation endpoint returned {}",
                reply.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use calnow_domain::{ClientConfigDocument, Credential};
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::AppPaths;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(AppPaths::rooted_at(dir.path()))
    }

    fn http() -> HttpClient {
        HttpClient::builder().max_attempts(1).timeout(Duration::from_secs(5)).build().unwrap()
    }

    #[tokio::test]
    async fn posts_access_token_then_deletes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .and(body_string_contains("token=live-access"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let registration =
            ClientConfigDocument::web("id", "secret").unwrap().registration().unwrap();
        assert!(store.save_credential(&Credential::issued(&registration, "live-access")));

        let manager = RevocationManager::new(store.clone(), http(), format!("{}/revoke", server.uri()));

        assert!(manager.revoke().await);
        assert!(!store.has_valid_credential());
    }

    #[tokio::test]
    async fn nothing_stored_skips_remote_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let manager = RevocationManager::new(store(&dir), http(), format!("{}/revoke", server.uri()));

        assert!(manager.revoke().await);
    }
}
