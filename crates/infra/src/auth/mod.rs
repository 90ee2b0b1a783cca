//! OAuth2 authorization code flow with a loopback redirect
//!
//! - [`session`]: single-assignment cell for the redirect outcome
//! - [`listener`]: loopback HTTP server receiving the redirect
//! - [`browser`]: opening the authorization URL
//! - [`exchange`]: code → credential fallback chain
//! - [`refresh`] / [`revoke`]: credential maintenance
//! - [`coordinator`]: the flow end to end

pub mod browser;
pub mod coordinator;
pub mod exchange;
pub mod listener;
pub mod refresh;
pub mod revoke;
pub mod session;
mod token_response;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use coordinator::AuthorizationCoordinator;
pub use exchange::{ExchangeStage, TokenExchanger};
pub use listener::CallbackListener;
pub use refresh::{RefreshManager, RefreshOutcome};
pub use revoke::RevocationManager;
pub use session::{AuthSession, CallbackOutcome};
