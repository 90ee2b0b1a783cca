//! Authorization code → credential, through an ordered fallback chain.
//!
//! 1. `scoped`: standard exchange; the granted scopes must match the
//!    requested set whenever the provider reports them.
//! 2. `unscoped`: standard exchange accepting whatever scopes are granted.
//! 3. `manual`: hand-built form POST read as raw JSON, for responses the
//!    standard client rejects. Its failure ends the attempt.
//!
//! An authorization code is single-use. Once the token endpoint has answered
//! 200, that reply is the only token the attempt will get: later stages
//! re-read it instead of posting the code again. A new request is made only
//! while no stage has received a token.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use calnow_domain::{
    impl_domain_label_conversions, AuthFailure, CalNowError, ClientRegistration, Credential,
};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{
    AsyncHttpClient, AuthType, AuthorizationCode, ClientId, ClientSecret, HttpRequest,
    HttpResponse, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::token_response::{error_summary, RawTokenResponse};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// One strategy of the exchange chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    Scoped,
    Unscoped,
    Manual,
}

impl_domain_label_conversions!(ExchangeStage {
    Scoped => "scoped",
    Unscoped => "unscoped",
    Manual => "manual",
});

impl ExchangeStage {
    /// Full chain in order.
    pub const CHAIN: [Self; 3] = [Self::Scoped, Self::Unscoped, Self::Manual];
}

/// State of one exchange, threaded through every stage.
struct ExchangeAttempt<'a> {
    code: &'a str,
    registration: &'a ClientRegistration,
    redirect_uri: &'a str,
    /// Body of the token endpoint's 200 reply, once there is one
    issued: Option<Vec<u8>>,
}

pub struct TokenExchanger {
    http: HttpClient,
    requested_scopes: BTreeSet<String>,
    stages: Vec<ExchangeStage>,
}

impl TokenExchanger {
    pub fn new<I, S>(http: HttpClient, requested_scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            http,
            requested_scopes: requested_scopes.into_iter().map(Into::into).collect(),
            stages: ExchangeStage::CHAIN.to_vec(),
        }
    }

    /// Restrict the chain to `stages`, in the given order.
    #[must_use]
    pub fn with_stages(mut self, stages: &[ExchangeStage]) -> Self {
        self.stages = stages.to_vec();
        self
    }

    pub fn stages(&self) -> &[ExchangeStage] {
        &self.stages
    }

    /// Exchange `code` for a credential.
    ///
    /// # Errors
    /// Returns `AuthFailure::TokenExchangeFailure` carrying the last stage's
    /// reason when every stage failed.
    pub async fn exchange(
        &self,
        code: &str,
        registration: &ClientRegistration,
        redirect_uri: &str,
    ) -> Result<Credential, AuthFailure> {
        let mut attempt = ExchangeAttempt { code, registration, redirect_uri, issued: None };
        let mut last_failure = String::from("no exchange stages configured");

        for &stage in &self.stages {
            match self.run_stage(stage, &mut attempt).await {
                Ok(credential) => {
                    info!(%stage, scopes = credential.scopes.len(), "token exchange succeeded");
                    return Ok(credential);
                }
                Err(reason) => {
                    warn!(%stage, %reason, code_consumed = attempt.issued.is_some(), "token exchange stage failed");
                    last_failure = format!("{stage} exchange: {reason}");
                }
            }
        }

        Err(AuthFailure::TokenExchangeFailure(last_failure))
    }

    async fn run_stage(
        &self,
        stage: ExchangeStage,
        attempt: &mut ExchangeAttempt<'_>,
    ) -> Result<Credential, String> {
        match stage {
            ExchangeStage::Scoped => {
                let token = self.standard_token(attempt).await?;
                if let Some(granted) = granted_scopes(&token) {
                    if granted != self.requested_scopes {
                        return Err(format!(
                            "granted scopes differ from requested ({} granted, {} requested)",
                            granted.len(),
                            self.requested_scopes.len()
                        ));
                    }
                }
                Ok(self.standard_credential(&token, attempt.registration))
            }
            ExchangeStage::Unscoped => {
                let token = self.standard_token(attempt).await?;
                Ok(self.standard_credential(&token, attempt.registration))
            }
            ExchangeStage::Manual => self.manual_exchange(attempt).await,
        }
    }

    /// Standard token response for the attempt: the issued reply if there is
    /// one, otherwise a fresh code exchange through the `oauth2` client.
    async fn standard_token(
        &self,
        attempt: &mut ExchangeAttempt<'_>,
    ) -> Result<BasicTokenResponse, String> {
        if let Some(body) = &attempt.issued {
            debug!("re-reading issued token response");
            return serde_json::from_slice(body)
                .map_err(|e| format!("issued token response is not standard: {e}"));
        }

        let registration = attempt.registration;
        let token_url = TokenUrl::new(registration.token_endpoint.clone())
            .map_err(|e| format!("invalid token endpoint: {e}"))?;
        let redirect_url = RedirectUrl::new(attempt.redirect_uri.to_string())
            .map_err(|e| format!("invalid redirect URI: {e}"))?;

        let mut client = BasicClient::new(ClientId::new(registration.client_id.clone()))
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(AuthType::RequestBody);
        if !registration.client_secret.is_empty() {
            client = client.set_client_secret(ClientSecret::new(registration.client_secret.clone()));
        }

        let transport = RecordingTransport::new(self.http.clone());
        let result = client
            .exchange_code(AuthorizationCode::new(attempt.code.to_string()))
            .request_async(&transport)
            .await;
        attempt.issued = transport.take_issued();

        result.map_err(describe_token_error)
    }

    fn standard_credential(
        &self,
        token: &BasicTokenResponse,
        registration: &ClientRegistration,
    ) -> Credential {
        let expires_in =
            token.expires_in().and_then(|lifetime| i64::try_from(lifetime.as_secs()).ok());

        Credential::issued(registration, token.access_token().secret().clone())
            .with_refresh_token(token.refresh_token().map(|t| t.secret().clone()))
            .with_scopes(granted_scopes(token).unwrap_or_else(|| self.requested_scopes.clone()))
            .with_expires_in(expires_in)
    }

    async fn manual_exchange(&self, attempt: &ExchangeAttempt<'_>) -> Result<Credential, String> {
        let registration = attempt.registration;

        let body = match &attempt.issued {
            Some(issued) => serde_json::from_slice::<Value>(issued)
                .map_err(|e| format!("issued token response is not JSON: {e}"))?,
            None => {
                let params = [
                    ("client_id", registration.client_id.as_str()),
                    ("client_secret", registration.client_secret.as_str()),
                    ("code", attempt.code),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", attempt.redirect_uri),
                ];
                let reply = self
                    .http
                    .post_form(&registration.token_endpoint, &params)
                    .await
                    .map_err(|e| e.to_string())?;
                if !reply.is_success() {
                    return Err(format!(
                        "token endpoint returned {}: {}",
                        reply.status,
                        error_summary(&reply.body)
                    ));
                }
                reply.body
            }
        };

        Ok(RawTokenResponse::from_json(&body)?.into_credential(registration, &self.requested_scopes))
    }
}

fn granted_scopes(token: &BasicTokenResponse) -> Option<BTreeSet<String>> {
    token.scopes().map(|scopes| scopes.iter().map(|scope| scope.as_str().to_string()).collect())
}

fn describe_token_error(err: RequestTokenError<CalNowError, BasicErrorResponse>) -> String {
    match err {
        RequestTokenError::ServerResponse(response) => format!("provider rejected the code: {response}"),
        RequestTokenError::Request(err) => err.to_string(),
        RequestTokenError::Parse(err, _) => format!("unexpected token response: {err}"),
        RequestTokenError::Other(message) => message,
    }
}

/// Transport for the `oauth2` client that goes through [`HttpClient`] and
/// keeps the body of a 200 reply.
struct RecordingTransport {
    http: HttpClient,
    issued: Mutex<Option<Vec<u8>>>,
}

impl RecordingTransport {
    fn new(http: HttpClient) -> Self {
        Self { http, issued: Mutex::new(None) }
    }

    fn take_issued(&self) -> Option<Vec<u8>> {
        self.issued.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    async fn forward(&self, request: HttpRequest) -> Result<HttpResponse, CalNowError> {
        let (parts, body) = request.into_parts();
        let builder = self
            .http
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body);

        let response = self.http.send(builder).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| CalNowError::from(InfraError::from(e)))?.to_vec();

        if status == reqwest::StatusCode::OK {
            *self.issued.lock().unwrap_or_else(PoisonError::into_inner) = Some(body.clone());
        }

        let mut reply = HttpResponse::new(body);
        *reply.status_mut() = status;
        *reply.headers_mut() = headers;
        Ok(reply)
    }
}

impl<'c> AsyncHttpClient<'c> for RecordingTransport {
    type Error = CalNowError;
    type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, CalNowError>> + Send + 'c>>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        Box::pin(self.forward(request))
    }
}
