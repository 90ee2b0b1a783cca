//! OAuth client registration
//!
//! Providers hand out client secrets as a JSON document with either a `web`
//! or an `installed` section. Both shapes normalize to one
//! [`ClientRegistration`].

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTH_ENDPOINT, DEFAULT_CERTS_URL, DEFAULT_PROJECT_ID, DEFAULT_REDIRECT_URI,
    DEFAULT_TOKEN_ENDPOINT,
};
use crate::errors::{CalNowError, Result};
use crate::impl_domain_label_conversions;

/// Which section of the client secrets document a registration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Web,
    Installed,
}

impl_domain_label_conversions!(RegistrationKind {
    Web => "web",
    Installed => "installed",
});

/// Client identity and endpoints issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub kind: RegistrationKind,
    pub client_id: String,
    pub client_secret: String,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    /// First registered redirect URI, if the document lists any
    pub redirect_uri: Option<String>,
}

/// One section of a client secrets document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider_x509_cert_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_ENDPOINT.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_string()
}

/// Client secrets document as downloaded from the provider console.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<ClientSecrets>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed: Option<ClientSecrets>,
}

impl ClientConfigDocument {
    /// Build a `web` document from a hand-entered client id and secret.
    ///
    /// # Errors
    /// Returns `CalNowError::InvalidInput` if either value is blank.
    pub fn web(client_id: &str, client_secret: &str) -> Result<Self> {
        let client_id = client_id.trim();
        let client_secret = client_secret.trim();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(CalNowError::InvalidInput(
                "both client id and client secret are required".to_string(),
            ));
        }

        Ok(Self {
            web: Some(ClientSecrets {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                project_id: Some(DEFAULT_PROJECT_ID.to_string()),
                auth_uri: default_auth_uri(),
                token_uri: default_token_uri(),
                auth_provider_x509_cert_url: Some(DEFAULT_CERTS_URL.to_string()),
                redirect_uris: vec![DEFAULT_REDIRECT_URI.to_string()],
            }),
            installed: None,
        })
    }

    /// Parse a client secrets document from JSON text.
    ///
    /// # Errors
    /// Returns `CalNowError::InvalidInput` if the text is not a valid
    /// document.
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| CalNowError::InvalidInput(format!("invalid client configuration: {e}")))
    }

    /// Whether the document carries a `web` or `installed` section.
    #[must_use]
    pub const fn has_client_section(&self) -> bool {
        self.web.is_some() || self.installed.is_some()
    }

    /// Normalize into a [`ClientRegistration`], preferring `web` over
    /// `installed`.
    ///
    /// # Errors
    /// Returns `CalNowError::Config` if neither section is present or the
    /// client id is blank.
    pub fn registration(&self) -> Result<ClientRegistration> {
        let (kind, secrets) = match (&self.web, &self.installed) {
            (Some(web), _) => (RegistrationKind::Web, web),
            (None, Some(installed)) => (RegistrationKind::Installed, installed),
            (None, None) => {
                return Err(CalNowError::Config(
                    "client configuration has neither a web nor an installed section".to_string(),
                ))
            }
        };

        if secrets.client_id.trim().is_empty() {
            return Err(CalNowError::Config("client configuration is missing client_id".into()));
        }

        Ok(ClientRegistration {
            kind,
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            auth_endpoint: secrets.auth_uri.clone(),
            token_endpoint: secrets.token_uri.clone(),
            redirect_uri: secrets.redirect_uris.first().cloned(),
        })
    }
}
