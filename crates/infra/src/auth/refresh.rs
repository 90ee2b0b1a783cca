//! Renewal of an expired access token with the stored refresh token.

use calnow_domain::{AuthFailure, Credential};
use tracing::{debug, info, warn};

use super::token_response::{error_summary, RawTokenResponse};
use crate::credentials::CredentialStore;
use crate::http::HttpClient;

/// Result of a refresh attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new credential was obtained and persisted
    Refreshed(Credential),
    /// The stored credential is still valid; nothing was done
    NotExpired,
}

pub struct RefreshManager {
    store: CredentialStore,
    http: HttpClient,
    expiry_skew_secs: i64,
}

impl RefreshManager {
    pub fn new(store: CredentialStore, http: HttpClient, expiry_skew_secs: i64) -> Self {
        Self { store, http, expiry_skew_secs }
    }

    /// Refresh the stored credential if it has expired.
    ///
    /// Returns `true` only when a new credential was obtained and saved.
    pub async fn refresh(&self) -> bool {
        match self.try_refresh().await {
            Ok(RefreshOutcome::Refreshed(_)) => true,
            Ok(RefreshOutcome::NotExpired) => false,
            Err(failure) => {
                warn!(error = %failure, "credential refresh did not happen");
                false
            }
        }
    }

    /// [`refresh`](Self::refresh) with the reason on failure.
    ///
    /// # Errors
    /// - `RefreshNotApplicable` if nothing is stored or the expired credential
    ///   has no refresh token
    /// - `RefreshFailure` if the token endpoint rejected the refresh
    /// - `CredentialPersistFailure` if the new credential could not be saved
    pub async fn try_refresh(&self) -> Result<RefreshOutcome, AuthFailure> {
        let credential = self
            .store
            .load_credential()
            .ok_or_else(|| AuthFailure::RefreshNotApplicable("no stored credentials".into()))?;

        if !credential.is_expired(self.expiry_skew_secs) {
            debug!(seconds_left = ?credential.seconds_until_expiry(), "credential still valid");
            return Ok(RefreshOutcome::NotExpired);
        }

        let refreshed = self.refresh_credential(&credential).await?;

        if !self.store.save_credential(&refreshed) {
            return Err(AuthFailure::CredentialPersistFailure);
        }

        info!("credential refreshed");
        Ok(RefreshOutcome::Refreshed(refreshed))
    }

    /// Run the refresh grant for `credential` without touching storage.
    async fn refresh_credential(&self, credential: &Credential) -> Result<Credential, AuthFailure> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthFailure::RefreshNotApplicable("no refresh token".into()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        let reply = self
            .http
            .post_form(&credential.token_endpoint, &params)
            .await
            .map_err(|e| AuthFailure::RefreshFailure(e.to_string()))?;

        if !reply.is_success() {
            return Err(AuthFailure::RefreshFailure(format!(
                "token endpoint returned {}: {}",
                reply.status,
                error_summary(&reply.body)
            )));
        }

        let parsed = RawTokenResponse::from_json(&reply.body).map_err(AuthFailure::RefreshFailure)?;
        Ok(parsed.refreshed(credential))
    }
}
