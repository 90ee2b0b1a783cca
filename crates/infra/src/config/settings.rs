//! Tunables of the sign-in flow
//!
//! Defaults match the registration the provider console hands out
//! (`http://localhost:8080/callback`). Two values can be overridden from the
//! environment:
//! - `CALNOW_CALLBACK_PORT`: loopback port (0 picks an ephemeral port)
//! - `CALNOW_AUTH_TIMEOUT_SECS`: how long to wait for the browser redirect

use std::time::Duration;

use calnow_domain::constants::{
    AUTHORIZATION_TIMEOUT_SECS, CALLBACK_HOST, CALLBACK_PATH, CALLBACK_POLL_INTERVAL_MS,
    CALLBACK_PORT, DEFAULT_REVOCATION_ENDPOINT, DEFAULT_SCOPES, EXPIRY_SKEW_SECS,
    HTTP_TIMEOUT_SECS, LISTENER_BIND_ATTEMPTS, LISTENER_BIND_RETRY_DELAY_MS,
};
use calnow_domain::{CalNowError, Result};

pub const CALLBACK_PORT_ENV: &str = "CALNOW_CALLBACK_PORT";
pub const AUTH_TIMEOUT_ENV: &str = "CALNOW_AUTH_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub callback_host: String,
    pub callback_port: u16,
    pub callback_path: String,
    pub bind_attempts: u32,
    pub bind_retry_delay: Duration,
    pub authorization_timeout: Duration,
    pub poll_interval: Duration,
    pub scopes: Vec<String>,
    /// Extra query parameters appended to the authorization URL
    pub extra_authorize_params: Vec<(String, String)>,
    pub revocation_endpoint: String,
    pub http_timeout: Duration,
    /// Seconds before the recorded expiry at which a token counts as expired
    pub expiry_skew_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            callback_host: CALLBACK_HOST.to_string(),
            callback_port: CALLBACK_PORT,
            callback_path: CALLBACK_PATH.to_string(),
            bind_attempts: LISTENER_BIND_ATTEMPTS,
            bind_retry_delay: Duration::from_millis(LISTENER_BIND_RETRY_DELAY_MS),
            authorization_timeout: Duration::from_secs(AUTHORIZATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(CALLBACK_POLL_INTERVAL_MS),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            extra_authorize_params: vec![
                ("access_type".to_string(), "offline".to_string()),
                ("prompt".to_string(), "consent".to_string()),
            ],
            revocation_endpoint: DEFAULT_REVOCATION_ENDPOINT.to_string(),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            expiry_skew_secs: EXPIRY_SKEW_SECS,
        }
    }
}

impl AuthSettings {
    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    /// Returns `CalNowError::Config` if an override is present but not a
    /// valid number.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Some(port) = env_var(CALLBACK_PORT_ENV) {
            settings.callback_port = port
                .parse::<u16>()
                .map_err(|e| CalNowError::Config(format!("Invalid callback port: {e}")))?;
        }

        if let Some(timeout) = env_var(AUTH_TIMEOUT_ENV) {
            let secs = timeout
                .parse::<u64>()
                .map_err(|e| CalNowError::Config(format!("Invalid auth timeout: {e}")))?;
            settings.authorization_timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    #[must_use]
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    #[must_use]
    pub fn with_revocation_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.revocation_endpoint = endpoint.into();
        self
    }

    /// Redirect URI for a listener bound to `port`.
    ///
    /// Uses `localhost` rather than the bind address; that is the form
    /// providers expect to see registered.
    pub fn redirect_uri(&self, port: u16) -> String {
        format!("http://localhost:{port}{}", self.callback_path)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
