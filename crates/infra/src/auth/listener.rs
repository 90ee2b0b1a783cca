//! Loopback HTTP server that receives the provider's redirect.
//!
//! Serves a single route (`/callback` by default) on a spawned tokio task.
//! The first redirect carrying `code` or `error` is recorded in the shared
//! [`AuthSession`]; the browser gets a small HTML page either way. Requests
//! are not logged above `debug`, and query strings never are.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use calnow_domain::AuthFailure;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::session::{AuthSession, CallbackOutcome};
use crate::config::AuthSettings;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authentication Successful</title></head>
<body>
<h2>Authentication Successful!</h2>
<p>You can close this window and return to the application.</p>
<script>window.close();</script>
</body>
</html>"#;

const INVALID_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Invalid Request</title></head>
<body><h2>Invalid Request</h2><p>No authorization code received.</p></body>
</html>"#;

const SERVER_ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Server Error</title></head>
<body><h2>Server Error</h2></body>
</html>"#;

/// Running callback server. Dropping it stops the server.
pub struct CallbackListener {
    port: u16,
    redirect_uri: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Bind the configured loopback address and start serving.
    ///
    /// A busy port is retried `settings.bind_attempts` times with
    /// `settings.bind_retry_delay` between attempts.
    ///
    /// # Errors
    /// Returns `AuthFailure::ListenerBindFailure` once every attempt failed.
    pub async fn start(settings: &AuthSettings, session: AuthSession) -> Result<Self, AuthFailure> {
        let listener = bind_with_retry(settings).await?;

        let port = listener
            .local_addr()
            .map_err(|err| AuthFailure::ListenerBindFailure {
                attempts: 1,
                reason: format!("failed to determine port: {err}"),
            })?
            .port();

        let app = Router::new().route(
            &settings.callback_path,
            get(move |query: Result<Query<HashMap<String, String>>, QueryRejection>| {
                handle_callback(query, session.clone())
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("OAuth callback server error: {}", err);
            }
        });

        info!(port, "callback listener started");

        Ok(Self {
            port,
            redirect_uri: settings.redirect_uri(port),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Port actually bound (differs from the configured one only when that
    /// was 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to send in the authorization request.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Stop serving. Best effort: a server that does not wind down within a
    /// short grace period is aborted.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
                Ok(Ok(())) => debug!(port = self.port, "callback listener stopped"),
                Ok(Err(err)) => warn!(error = %err, "callback listener task failed"),
                Err(_) => {
                    warn!(port = self.port, "callback listener did not stop in time; aborting");
                    handle.abort();
                }
            }
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn bind_with_retry(settings: &AuthSettings) -> Result<TcpListener, AuthFailure> {
    let address = (settings.callback_host.as_str(), settings.callback_port);
    let attempts = settings.bind_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match TcpListener::bind(address).await {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                warn!(
                    port = settings.callback_port,
                    attempt,
                    max_attempts = attempts,
                    error = %err,
                    "callback port unavailable"
                );
                last_error = err.to_string();
                if attempt < attempts {
                    tokio::time::sleep(settings.bind_retry_delay).await;
                }
            }
        }
    }

    Err(AuthFailure::ListenerBindFailure { attempts, reason: last_error })
}

async fn handle_callback(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    session: AuthSession,
) -> (StatusCode, Html<String>) {
    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => {
            debug!(error = %rejection, "malformed callback request");
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(SERVER_ERROR_PAGE.to_string()));
        }
    };

    let param = |name: &str| params.get(name).filter(|value| !value.is_empty()).cloned();

    if let Some(code) = param("code") {
        if !session.record(CallbackOutcome::Code(code)) {
            debug!("ignoring repeated callback");
        }
        return (StatusCode::OK, Html(SUCCESS_PAGE.to_string()));
    }

    if let Some(error) = param("error") {
        debug!(%error, "provider returned an error");
        let page = failure_page(&error);
        session.record(CallbackOutcome::Error(error));
        return (StatusCode::BAD_REQUEST, Html(page));
    }

    debug!("callback without code or error");
    (StatusCode::BAD_REQUEST, Html(INVALID_PAGE.to_string()))
}

fn failure_page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Authentication Failed</title></head>
<body>
<h2>Authentication Failed</h2>
<p>Error: {}</p>
<p>You can close this window and try again.</p>
</body>
</html>"#,
        escape_html(error)
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            bind_attempts: 2,
            bind_retry_delay: Duration::from_millis(20),
            ..AuthSettings::default()
        }
        .with_callback_port(0)
    }

    async fn get(url: &str) -> (u16, String) {
        let response = reqwest::Client::builder().no_proxy().build().unwrap().get(url).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn code_is_recorded_and_success_page_served() {
        let session = AuthSession::new(Duration::from_secs(5));
        let listener = CallbackListener::start(&settings(), session.clone()).await.unwrap();
        let url = format!("http://127.0.0.1:{}/callback?code=4%2F0abc&scope=x", listener.port());

        let (status, body) = get(&url).await;

        assert_eq!(status, 200);
        assert!(body.contains("Authentication Successful!"));
        assert_eq!(session.outcome(), Some(&CallbackOutcome::Code("4/0abc".into())));
        listener.shutdown().await;
    }

    #[tokio::test]
    async fn provider_error_is_recorded_with_400() {
        let session = AuthSession::new(Duration::from_secs(5));
        let listener = CallbackListener::start(&settings(), session.clone()).await.unwrap();
        let url = format!("http://127.0.0.1:{}/callback?error=access_denied", listener.port());

        let (status, body) = get(&url).await;

        assert_eq!(status, 400);
        assert!(body.contains("Error: access_denied"));
        assert_eq!(session.outcome(), Some(&CallbackOutcome::Error("access_denied".into())));
        listener.shutdown().await;
    }

    #[tokio::test]
    async fn request_without_parameters_leaves_session_empty() {
        let session = AuthSession::new(Duration::from_secs(5));
        let listener = CallbackListener::start(&settings(), session.clone()).await.unwrap();

        let (status, body) = get(&format!("http://127.0.0.1:{}/callback", listener.port())).await;
        assert_eq!(status, 400);
        assert!(body.contains("Invalid Request"));

        let (status, _) = get(&format!("http://127.0.0.1:{}/callback?code=", listener.port())).await;
        assert_eq!(status, 400);

        assert!(session.outcome().is_none());
        listener.shutdown().await;
    }

    #[tokio::test]
    async fn error_text_is_escaped() {
        let session = AuthSession::new(Duration::from_secs(5));
        let listener = CallbackListener::start(&settings(), session).await.unwrap();
        let url = format!(
            "http://127.0.0.1:{}/callback?error=%3Cscript%3Ealert(1)%3C%2Fscript%3E",
            listener.port()
        );

        let (_, body) = get(&url).await;

        assert!(!body.contains("<script>alert"));
        assert!(body.contains("&lt;script&gt;"));
        listener.shutdown().await;
    }

    #[tokio::test]
    async fn busy_port_fails_after_all_attempts() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();
        let settings = settings().with_callback_port(port);

        let started = std::time::Instant::now();
        let result = CallbackListener::start(&settings, AuthSession::new(Duration::from_secs(5))).await;

        match result {
            Err(AuthFailure::ListenerBindFailure { attempts, .. }) => assert_eq!(attempts, 2),
            Err(other) => panic!("expected bind failure, got {other:?}"),
            Ok(_) => panic!("expected bind failure, listener started"),
        }
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn shutdown_releases_the_port() {
        let listener =
            CallbackListener::start(&settings(), AuthSession::new(Duration::from_secs(5))).await.unwrap();
        let port = listener.port();

        listener.shutdown().await;

        let rebound = tokio::net::TcpListener::bind(("127.0.0.1", port)).await;
        assert!(rebound.is_ok());
    }

    #[test]
    fn redirect_uri_uses_localhost_and_bound_port() {
        assert_eq!(settings().redirect_uri(43123), "http://localhost:43123/callback");
    }
}
