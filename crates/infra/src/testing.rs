//! Browser doubles for exercising the sign-in flow without a user.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use calnow_domain::{CalNowError, Result};
use tracing::debug;
use url::Url;

use crate::auth::BrowserLauncher;

/// What the simulated user does once the browser opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedUser {
    /// Approve: the provider redirects with this authorization code
    Approve(String),
    /// Deny: the provider redirects with this `error` value
    Deny(String),
    /// Redirect with an arbitrary raw query string
    RawQuery(String),
    /// Never come back
    Abandon,
}

/// Launcher that records URLs and drives the loopback redirect itself.
#[derive(Debug, Clone)]
pub struct RedirectingBrowser {
    user: SimulatedUser,
    opened: Arc<Mutex<Vec<String>>>,
}

impl RedirectingBrowser {
    pub fn new(user: SimulatedUser) -> Self {
        Self { user, opened: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Every URL passed to [`BrowserLauncher::open`] so far.
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn redirect_query(&self) -> Option<String> {
        match &self.user {
            SimulatedUser::Approve(code) => Some(format!("code={}", urlencoding::encode(code))),
            SimulatedUser::Deny(error) => Some(format!("error={}", urlencoding::encode(error))),
            SimulatedUser::RawQuery(query) => Some(query.clone()),
            SimulatedUser::Abandon => None,
        }
    }
}

#[async_trait]
impl BrowserLauncher for RedirectingBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).push(url.to_string());

        let Some(query) = self.redirect_query() else {
            return Ok(());
        };

        let authorization_url =
            Url::parse(url).map_err(|e| CalNowError::InvalidInput(format!("bad URL: {e}")))?;
        let redirect_uri = authorization_url
            .query_pairs()
            .find(|(key, _)| key == "redirect_uri")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| CalNowError::InvalidInput("authorization URL lacks redirect_uri".into()))?;

        // The listener binds IPv4 loopback only.
        let target = format!("{}?{query}", redirect_uri.replacen("localhost", "127.0.0.1", 1));

        tokio::spawn(async move {
            let client = reqwest::Client::builder().no_proxy().build();
            match client {
                Ok(client) => match client.get(&target).send().await {
                    Ok(response) => debug!(status = %response.status(), "simulated redirect delivered"),
                    Err(err) => debug!(error = %err, "simulated redirect failed"),
                },
                Err(err) => debug!(error = %err, "could not build redirect client"),
            }
        });

        Ok(())
    }
}
