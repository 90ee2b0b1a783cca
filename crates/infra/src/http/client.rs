use std::time::Duration;

use calnow_domain::constants::HTTP_TIMEOUT_SECS;
use calnow_domain::CalNowError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::InfraError;

const DEFAULT_ATTEMPTS: usize = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// Status and decoded body of a form POST to a token-style endpoint.
///
/// `body` is `Value::Null` when the endpoint did not answer with JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct FormReply {
    pub status: StatusCode,
    pub body: Value,
}

impl FormReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Client for the provider's token and revocation endpoints.
///
/// Redirects are never followed; token endpoints answer directly and a
/// redirect would leak form-encoded secrets to another host. Transport
/// failures and 5xx answers are retried up to the configured attempt count.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// POST `form` to `url` and decode the JSON answer, whatever its status.
    ///
    /// # Errors
    /// Returns `CalNowError::Network` when no response was received.
    pub async fn post_form<T>(&self, url: &str, form: &T) -> Result<FormReply, CalNowError>
    where
        T: Serialize + ?Sized,
    {
        let response = self.send(self.client.post(url).form(form)).await?;
        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(Value::Null),
            Err(err) => {
                debug!(%status, error = %err, "response body unreadable");
                Value::Null
            }
        };

        Ok(FormReply { status, body })
    }

    /// Send `builder`, retrying transport failures and 5xx answers.
    ///
    /// # Errors
    /// Returns the mapped transport error of the last attempt.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, CalNowError> {
        let mut retries = 0;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| CalNowError::Internal("streaming request bodies cannot be retried".into()))?
                .build()
                .map_err(network_error)?;

            // Path only; query strings may carry tokens.
            let target = format!("{} {}", request.method(), request.url().path());
            let last_attempt = retries + 1 >= self.max_attempts;

            match self.client.execute(request).await {
                Ok(response) if response.status().is_server_error() && !last_attempt => {
                    debug!(%target, status = %response.status(), retries, "server error; retrying");
                }
                Ok(response) => {
                    debug!(%target, status = %response.status(), "response received");
                    return Ok(response);
                }
                Err(err) if !last_attempt && is_transient(&err) => {
                    debug!(%target, error = %err, retries, "transport failure; retrying");
                }
                Err(err) => return Err(network_error(err)),
            }

            retries += 1;
            tokio::time::sleep(self.backoff(retries)).await;
        }
    }

    /// Delay before retry number `retries` (1-based), doubling each time.
    fn backoff(&self, retries: usize) -> Duration {
        let exponent = u32::try_from(retries.saturating_sub(1)).unwrap_or(u32::MAX).min(6);
        self.base_backoff.saturating_mul(1 << exponent)
    }
}

fn network_error(err: reqwest::Error) -> CalNowError {
    InfraError::from(err).into()
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            max_attempts: DEFAULT_ATTEMPTS,
            base_backoff: DEFAULT_BACKOFF,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per request, the first one included. At least 1.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// # Errors
    /// Returns `CalNowError::Config` if the TLS backend cannot be set up.
    pub fn build(self) -> Result<HttpClient, CalNowError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .user_agent(concat!("calendar-now/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CalNowError::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(HttpClient { client, max_attempts: self.max_attempts, base_backoff: self.base_backoff })
    }
}
