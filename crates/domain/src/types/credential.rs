//! Long-lived OAuth credential
//!
//! A `Credential` is superseded, never merged: every successful
//! re-authentication or refresh produces a whole new value that replaces the
//! stored one.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::registration::ClientRegistration;

/// Access/refresh token pair plus the client identity that obtained it.
///
/// Field names on the wire follow the original on-disk document
/// (`token`, `token_uri`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API calls
    #[serde(rename = "token")]
    pub access_token: String,

    /// Refresh token; absent when the provider did not issue one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token endpoint used for refresh
    #[serde(rename = "token_uri")]
    pub token_endpoint: String,

    pub client_id: String,
    pub client_secret: String,

    /// Granted scopes
    #[serde(default)]
    pub scopes: BTreeSet<String>,

    /// Absolute expiry of the access token (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Start a credential issued for `registration`.
    ///
    /// The client identity and token endpoint are copied from the
    /// registration so a stored credential can never drift from the client
    /// that created it.
    #[must_use]
    pub fn issued(registration: &ClientRegistration, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_endpoint: registration.token_endpoint.clone(),
            client_id: registration.client_id.clone(),
            client_secret: registration.client_secret.clone(),
            scopes: BTreeSet::new(),
            expiry: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token.filter(|token| !token.is_empty());
        self
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the expiry from a token response's `expires_in` (seconds).
    ///
    /// Non-positive or missing lifetimes leave the credential without an
    /// expiry.
    #[must_use]
    pub fn with_expires_in(mut self, expires_in: Option<i64>) -> Self {
        self.expiry =
            expires_in.filter(|secs| *secs > 0).map(|secs| Utc::now() + Duration::seconds(secs));
        self
    }

    #[must_use]
    pub const fn with_expiry(mut self, expiry: Option<DateTime<Utc>>) -> Self {
        self.expiry = expiry;
        self
    }

    /// Check if the access token is expired or expires within `skew_seconds`.
    ///
    /// A credential without an expiry is never considered expired.
    #[must_use]
    pub fn is_expired(&self, skew_seconds: i64) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + Duration::seconds(skew_seconds) >= expiry,
            None => false,
        }
    }

    /// Seconds until expiry, `None` when no expiry is recorded.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expiry.map(|expiry| (expiry - Utc::now()).num_seconds())
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// Scopes as a single space-separated string.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    /// Whether this credential was issued to the given client.
    #[must_use]
    pub fn belongs_to(&self, registration: &ClientRegistration) -> bool {
        self.client_id == registration.client_id
            && self.client_secret == registration.client_secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Split a space-delimited OAuth scope string into a set.
#[must_use]
pub fn parse_scope_string(scope: &str) -> BTreeSet<String> {
    scope.split_whitespace().map(str::to_string).collect()
}
