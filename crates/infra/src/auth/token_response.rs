//! Lenient parsing of raw token endpoint responses.
//!
//! Used where the standard response type is too strict: missing
//! `token_type`, `expires_in` sent as a string, or `scope` omitted.

use std::collections::BTreeSet;

use calnow_domain::{parse_scope_string, ClientRegistration, Credential};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scopes: Option<BTreeSet<String>>,
    pub expires_in: Option<i64>,
}

impl RawTokenResponse {
    /// Pull the token fields out of a successful response body.
    pub fn from_json(body: &Value) -> Result<Self, String> {
        let access_token = string_field(body, "access_token")
            .ok_or_else(|| format!("response missing access_token: {}", error_summary(body)))?;

        let expires_in = match body.get("expires_in") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        Ok(Self {
            access_token,
            refresh_token: string_field(body, "refresh_token"),
            scopes: string_field(body, "scope").map(|scope| parse_scope_string(&scope)),
            expires_in,
        })
    }

    /// Build a credential for `registration`, using `fallback_scopes` when
    /// the response did not report any.
    pub fn into_credential(
        self,
        registration: &ClientRegistration,
        fallback_scopes: &BTreeSet<String>,
    ) -> Credential {
        Credential::issued(registration, self.access_token)
            .with_refresh_token(self.refresh_token)
            .with_scopes(self.scopes.unwrap_or_else(|| fallback_scopes.clone()))
            .with_expires_in(self.expires_in)
    }

    /// Supersede `previous` with a refresh response.
    ///
    /// The old refresh token and scopes carry over when the provider does
    /// not rotate or restate them.
    pub fn refreshed(self, previous: &Credential) -> Credential {
        let mut credential = previous.clone().with_expires_in(self.expires_in);
        credential.access_token = self.access_token;
        if let Some(refresh_token) = self.refresh_token {
            credential.refresh_token = Some(refresh_token);
        }
        if let Some(scopes) = self.scopes {
            credential.scopes = scopes;
        }
        credential
    }
}

/// `error` and `error_description` of an OAuth error body, for logs.
pub(crate) fn error_summary(body: &Value) -> String {
    match (string_field(body, "error"), string_field(body, "error_description")) {
        (Some(error), Some(description)) => format!("{error}: {description}"),
        (Some(error), None) => error,
        _ => "no error details".to_string(),
    }
}

fn string_field(body: &Value, name: &str) -> Option<String> {
    body.get(name).and_then(Value::as_str).filter(|value| !value.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tolerates_missing_token_type_and_string_expiry() {
        let parsed = RawTokenResponse::from_json(&json!({
            "access_token": "ya29.token",
            "expires_in": "3599",
            "scope": "b a"
        }))
        .unwrap();

        assert_eq!(parsed.access_token, "ya29.token");
        assert_eq!(parsed.expires_in, Some(3599));
        assert_eq!(parsed.scopes.unwrap().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(parsed.refresh_token.is_none());
    }

    #[test]
    fn refresh_keeps_unrotated_refresh_token_and_scopes() {
        let registration = ClientRegistration {
            kind: calnow_domain::RegistrationKind::Installed,
            client_id: "id".into(),
            client_secret: "secret".into(),
            auth_endpoint: "https://auth.example.com".into(),
            token_endpoint: "https://token.example.com".into(),
            redirect_uri: None,
        };
        let previous = Credential::issued(&registration, "old-access")
            .with_refresh_token(Some("keep-me".into()))
            .with_scopes(["calendar"]);

        let refreshed = RawTokenResponse::from_json(&json!({
            "access_token": "new-access",
            "expires_in": 3600
        }))
        .unwrap()
        .refreshed(&previous);

        assert_eq!(refreshed.access_token, "new-access");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("keep-me"));
        assert!(refreshed.scopes.contains("calendar"));
        assert!(!refreshed.is_expired(60));
    }

    #[test]
    fn missing_access_token_reports_provider_error() {
        let err = RawTokenResponse::from_json(&json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        }))
        .unwrap_err();

        assert!(err.contains("invalid_grant: Bad Request"));
        assert!(RawTokenResponse::from_json(&json!({"access_token": ""})).is_err());
    }
}
