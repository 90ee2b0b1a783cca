//! Shared fixtures for the infra integration tests.

#![allow(dead_code)]

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use calnow_domain::{ClientConfigDocument, ClientRegistration, Credential};
use calnow_infra::testing::{RedirectingBrowser, SimulatedUser};
use calnow_infra::{AppPaths, AuthSettings, AuthorizationCoordinator, CredentialStore};
use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

pub const SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Temporary installation plus a mock identity provider.
pub struct TestEnv {
    pub dir: TempDir,
    pub paths: AppPaths,
    pub server: MockServer,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir should be created");
        let paths = AppPaths::rooted_at(dir.path());
        let server = MockServer::start().await;
        Self { dir, paths, server }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.server.uri())
    }

    pub fn revocation_endpoint(&self) -> String {
        format!("{}/revoke", self.server.uri())
    }

    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(self.paths.clone())
    }

    /// Ship an `installed` client registration next to the executable,
    /// pointing at the mock token endpoint.
    pub fn install_client_config(&self) -> ClientRegistration {
        let document = json!({
            "installed": {
                "client_id": "test-client.apps.example.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.example.com/o/oauth2/auth",
                "token_uri": self.token_endpoint(),
                "redirect_uris": ["http://localhost"]
            }
        });
        let path = self.paths.installed_client_config();
        fs::create_dir_all(path.parent().expect("install dir")).expect("create install dir");
        fs::write(&path, document.to_string()).expect("write client config");

        ClientConfigDocument::from_json(&document.to_string())
            .and_then(|doc| doc.registration())
            .expect("valid registration")
    }

    /// Settings tuned for tests: ephemeral port, short retries and timeout.
    pub fn settings(&self) -> AuthSettings {
        AuthSettings {
            bind_attempts: 2,
            bind_retry_delay: Duration::from_millis(50),
            authorization_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(20),
            http_timeout: Duration::from_secs(5),
            ..AuthSettings::default()
        }
        .with_callback_port(0)
        .with_revocation_endpoint(self.revocation_endpoint())
    }

    pub fn coordinator(&self, settings: AuthSettings, browser: &RedirectingBrowser) -> AuthorizationCoordinator {
        AuthorizationCoordinator::new(self.store(), settings)
            .expect("coordinator should build")
            .with_browser(Arc::new(browser.clone()))
    }

    /// Credential issued by this environment's registration.
    pub fn credential(&self, access_token: &str) -> Credential {
        let registration = ClientRegistration {
            token_endpoint: self.token_endpoint(),
            ..ClientConfigDocument::web("test-client.apps.example.com", "test-secret")
                .and_then(|doc| doc.registration())
                .expect("valid registration")
        };
        Credential::issued(&registration, access_token).with_scopes(SCOPES)
    }

    pub fn expired_credential(&self, access_token: &str, refresh_token: Option<&str>) -> Credential {
        self.credential(access_token)
            .with_refresh_token(refresh_token.map(str::to_string))
            .with_expiry(Some(Utc::now() - chrono::Duration::minutes(10)))
    }
}

pub fn approving_browser(code: &str) -> RedirectingBrowser {
    RedirectingBrowser::new(SimulatedUser::Approve(code.to_string()))
}

/// A standard token response echoing the requested scopes.
pub fn token_response(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "Bearer",
        "expires_in": 3599,
        "scope": SCOPES.join(" ")
    })
}

/// Port the listener was bound to, read back from the opened URL.
pub fn redirect_port(browser: &RedirectingBrowser) -> Option<u16> {
    let opened = browser.opened_urls();
    let url = url::Url::parse(opened.first()?).ok()?;
    let redirect = url.query_pairs().find(|(k, _)| k == "redirect_uri")?.1.into_owned();
    url::Url::parse(&redirect).ok()?.port()
}
