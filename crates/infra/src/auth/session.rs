//! Single-assignment result cell shared by the callback handler and the
//! coordinator.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::Instant;

/// What the provider's redirect carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Authorization code to exchange
    Code(String),
    /// Provider `error` parameter (e.g. `access_denied`)
    Error(String),
}

/// State of one authorization attempt.
///
/// The outcome is written at most once; later redirects cannot overwrite it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    outcome: Arc<OnceLock<CallbackOutcome>>,
    timeout: Duration,
    deadline: Instant,
}

impl AuthSession {
    pub fn new(timeout: Duration) -> Self {
        Self { outcome: Arc::new(OnceLock::new()), timeout, deadline: Instant::now() + timeout }
    }

    /// Restart the countdown, e.g. once the browser has been opened.
    pub fn reset_deadline(&mut self) {
        self.deadline = Instant::now() + self.timeout;
    }

    /// Record the outcome. Returns `false` if one was already recorded.
    pub fn record(&self, outcome: CallbackOutcome) -> bool {
        self.outcome.set(outcome).is_ok()
    }

    pub fn outcome(&self) -> Option<&CallbackOutcome> {
        self.outcome.get()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Poll until an outcome is recorded or the deadline passes.
    pub async fn wait(&self, poll_interval: Duration) -> Option<CallbackOutcome> {
        loop {
            if let Some(outcome) = self.outcome() {
                return Some(outcome.clone());
            }
            if self.is_expired() {
                return None;
            }

            let remaining = self.deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }
}
