//! End-to-end sign-in flow.
//!
//! ```text
//! Idle → ListenerStarting → WaitingForUser → ExchangingToken → Succeeded
//!   ↘ Failed (missing config, busy port, timeout, denial, exchange, save)
//! ```
//!
//! The coordinator is also the single entry point the UI uses for refresh,
//! sign-out and credential lookup. Public operations report plain
//! `bool`/`Option` results and log the cause; `authenticate` and
//! `try_refresh` return the [`AuthFailure`] for callers that want it.

use std::sync::Arc;

use calnow_domain::{impl_domain_label_conversions, AuthFailure, ClientRegistration, Credential, Result};
use tracing::{debug, error, info, warn};

use super::browser::{BrowserLauncher, SystemBrowser};
use super::exchange::TokenExchanger;
use super::listener::CallbackListener;
use super::refresh::{RefreshManager, RefreshOutcome};
use super::revoke::RevocationManager;
use super::session::{AuthSession, CallbackOutcome};
use crate::config::AuthSettings;
use crate::credentials::CredentialStore;
use crate::http::HttpClient;
use crate::observability::redact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthPhase {
    ListenerStarting,
    WaitingForUser,
    ExchangingToken,
    Succeeded,
}

impl_domain_label_conversions!(AuthPhase {
    ListenerStarting => "listener_starting",
    WaitingForUser => "waiting_for_user",
    ExchangingToken => "exchanging_token",
    Succeeded => "succeeded",
});

pub struct AuthorizationCoordinator {
    store: CredentialStore,
    settings: AuthSettings,
    browser: Arc<dyn BrowserLauncher>,
    exchanger: TokenExchanger,
    refresher: RefreshManager,
    revoker: RevocationManager,
}

impl AuthorizationCoordinator {
    /// Build a coordinator that opens the system browser.
    ///
    /// # Errors
    /// Returns `CalNowError::Network`/`Config` if the HTTP clients cannot be
    /// constructed.
    pub fn new(store: CredentialStore, settings: AuthSettings) -> Result<Self> {
        // An authorization code is single-use; never replay the exchange.
        let exchange_http =
            HttpClient::builder().timeout(settings.http_timeout).max_attempts(1).build()?;
        let http = HttpClient::builder().timeout(settings.http_timeout).build()?;

        Ok(Self {
            exchanger: TokenExchanger::new(exchange_http, settings.scopes.clone()),
            refresher: RefreshManager::new(store.clone(), http.clone(), settings.expiry_skew_secs),
            revoker: RevocationManager::new(store.clone(), http, settings.revocation_endpoint.clone()),
            browser: Arc::new(SystemBrowser),
            store,
            settings,
        })
    }

    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    #[must_use]
    pub fn with_exchanger(mut self, exchanger: TokenExchanger) -> Self {
        self.exchanger = exchanger;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// True until a readable credential has been stored.
    pub fn is_first_run(&self) -> bool {
        !self.store.has_valid_credential()
    }

    pub fn has_client_registration(&self) -> bool {
        self.store.has_client_registration()
    }

    /// Stored credential, as-is.
    pub fn get_credentials(&self) -> Option<Credential> {
        self.store.load_credential()
    }

    /// Run the interactive sign-in. Returns `true` once a credential has
    /// been obtained and saved.
    pub async fn perform_authentication(&self) -> bool {
        match self.authenticate().await {
            Ok(_) => true,
            Err(failure) => {
                error!(error = %failure, "authentication failed");
                false
            }
        }
    }

    /// [`perform_authentication`](Self::perform_authentication) with the
    /// failure reason.
    ///
    /// # Errors
    /// Any `AuthFailure` kind except the refresh and revocation ones.
    pub async fn authenticate(&self) -> std::result::Result<Credential, AuthFailure> {
        let registration =
            self.store.get_client_registration().ok_or(AuthFailure::ConfigurationMissing)?;

        enter(AuthPhase::ListenerStarting);
        let mut session = AuthSession::new(self.settings.authorization_timeout);
        let listener = CallbackListener::start(&self.settings, session.clone()).await?;

        enter(AuthPhase::WaitingForUser);
        let authorization_url = self.authorization_url(&registration, listener.redirect_uri());
        if let Err(err) = self.browser.open(&authorization_url).await {
            warn!(error = %err, url = %authorization_url, "could not open browser; open the URL manually");
        }

        session.reset_deadline();
        let outcome = session.wait(self.settings.poll_interval).await;
        let redirect_uri = listener.redirect_uri().to_string();
        listener.shutdown().await;

        let code = match outcome {
            Some(CallbackOutcome::Code(code)) => code,
            Some(CallbackOutcome::Error(error)) => return Err(AuthFailure::AuthorizationDenied(error)),
            None => return Err(AuthFailure::AuthorizationTimeout),
        };
        debug!(code = %redact(&code), "authorization code received");

        enter(AuthPhase::ExchangingToken);
        let credential = self.exchanger.exchange(&code, &registration, &redirect_uri).await?;

        if !self.store.save_credential(&credential) {
            return Err(AuthFailure::CredentialPersistFailure);
        }

        enter(AuthPhase::Succeeded);
        info!(client_id = %registration.client_id, "authentication completed");
        Ok(credential)
    }

    /// Refresh the stored credential if it has expired.
    pub async fn refresh(&self) -> bool {
        self.refresher.refresh().await
    }

    /// [`refresh`](Self::refresh) with the failure reason.
    ///
    /// # Errors
    /// See [`RefreshManager::try_refresh`].
    pub async fn try_refresh(&self) -> std::result::Result<RefreshOutcome, AuthFailure> {
        self.refresher.try_refresh().await
    }

    /// Credential ready for API calls, refreshing it first if it has expired.
    ///
    /// `None` if nothing is stored, if the stored credential was issued to a
    /// different client than the current registration, or if the credential
    /// is expired and could not be refreshed.
    pub async fn valid_credentials(&self) -> Option<Credential> {
        if let (Some(stored), Some(registration)) =
            (self.store.load_credential(), self.store.get_client_registration())
        {
            if !stored.belongs_to(&registration) {
                warn!(
                    stored_client = %stored.client_id,
                    registered_client = %registration.client_id,
                    "stored credential belongs to another client registration"
                );
                return None;
            }
        }

        match self.refresher.try_refresh().await {
            Ok(RefreshOutcome::Refreshed(credential)) => Some(credential),
            Ok(RefreshOutcome::NotExpired) => self.store.load_credential(),
            Err(failure) => {
                warn!(error = %failure, "no usable credentials");
                None
            }
        }
    }

    /// Sign out: revoke remotely (best effort) and delete locally.
    pub async fn revoke(&self) -> bool {
        self.revoker.revoke().await
    }

    /// Forget the current sign-in so the next start runs setup again.
    pub async fn reset(&self) -> bool {
        info!("resetting authentication");
        self.revoke().await
    }

    /// Authorization URL for `registration` redirecting to `redirect_uri`.
    pub fn authorization_url(&self, registration: &ClientRegistration, redirect_uri: &str) -> String {
        let scope = self.settings.scopes.join(" ");
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", registration.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
        ];
        params.extend(self.settings.extra_authorize_params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if registration.auth_endpoint.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", registration.auth_endpoint)
    }
}

fn enter(phase: AuthPhase) {
    debug!(%phase, "authentication phase");
}
