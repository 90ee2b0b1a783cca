//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CalendarNow
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CalNowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for CalendarNow operations
pub type Result<T> = std::result::Result<T, CalNowError>;

/// Why an authentication-related operation did not succeed.
///
/// Public operations collapse these into `bool`/`Option` after logging; the
/// detail-returning variants of those operations hand them to callers that
/// ask for them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AuthFailure {
    #[error("client configuration missing")]
    ConfigurationMissing,

    #[error("callback listener unavailable after {attempts} attempts: {reason}")]
    ListenerBindFailure { attempts: u32, reason: String },

    #[error("authentication timeout or user cancelled")]
    AuthorizationTimeout,

    #[error("authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("token exchange failed: {0}")]
    TokenExchangeFailure(String),

    #[error("failed to save credentials")]
    CredentialPersistFailure,

    #[error("refresh not applicable: {0}")]
    RefreshNotApplicable(String),

    #[error("token refresh failed: {0}")]
    RefreshFailure(String),

    #[error("revocation request failed: {0}")]
    RevocationNetworkFailure(String),
}

impl AuthFailure {
    /// Short message suitable for display in a dialog.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => {
                "Client configuration missing. Please set up OAuth credentials."
            }
            Self::ListenerBindFailure { .. } => {
                "Could not start the local sign-in listener. Close other applications using the port and try again."
            }
            Self::AuthorizationTimeout => "Authentication timed out. Please try again.",
            Self::AuthorizationDenied(_) => "Sign-in was denied. Please try again.",
            Self::TokenExchangeFailure(_) | Self::RevocationNetworkFailure(_) => {
                "Could not reach the server. Please check your internet connection."
            }
            Self::CredentialPersistFailure => "Signed in, but the credentials could not be saved.",
            Self::RefreshNotApplicable(_) => "Please sign in again.",
            Self::RefreshFailure(_) => "Your session could not be renewed. Please sign in again.",
        }
    }

    /// Whether the failure requires a fresh interactive sign-in to recover.
    #[must_use]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::RefreshNotApplicable(_) | Self::RefreshFailure(_))
    }
}

impl From<AuthFailure> for CalNowError {
    fn from(value: AuthFailure) -> Self {
        match value {
            AuthFailure::ConfigurationMissing => Self::Config(value.to_string()),
            AuthFailure::TokenExchangeFailure(_) | AuthFailure::RevocationNetworkFailure(_) => {
                Self::Network(value.to_string())
            }
            AuthFailure::CredentialPersistFailure => Self::Io(value.to_string()),
            other => Self::Auth(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_serializes_with_kind_tag() {
        let failure = AuthFailure::AuthorizationDenied("access_denied".into());
        let json = serde_json::to_string(&failure).unwrap();
        assert_eq!(json, r#"{"kind":"authorization_denied","detail":"access_denied"}"#);
    }

    #[test]
    fn auth_failure_maps_into_domain_error() {
        let err: CalNowError = AuthFailure::ConfigurationMissing.into();
        assert!(matches!(err, CalNowError::Config(_)));

        let err: CalNowError = AuthFailure::TokenExchangeFailure("boom".into()).into();
        assert!(matches!(err, CalNowError::Network(_)));

        let err: CalNowError = AuthFailure::AuthorizationTimeout.into();
        assert_eq!(err, CalNowError::Auth("authentication timeout or user cancelled".into()));
    }

    #[test]
    fn refresh_failures_require_reauthentication() {
        assert!(AuthFailure::RefreshNotApplicable("no refresh token".into())
            .requires_reauthentication());
        assert!(!AuthFailure::AuthorizationTimeout.requires_reauthentication());
    }

    #[test]
    fn listener_failure_is_distinct_from_timeout() {
        let bind = AuthFailure::ListenerBindFailure { attempts: 5, reason: "in use".into() };
        assert_ne!(bind.user_message(), AuthFailure::AuthorizationTimeout.user_message());
        assert!(bind.to_string().contains("5 attempts"));
    }
}
