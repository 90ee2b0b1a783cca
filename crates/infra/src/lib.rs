//! # CalendarNow Infrastructure
//!
//! Everything in the authentication core that touches the outside world.
//!
//! This crate contains:
//! - Path resolution and flow settings (`config`)
//! - The encrypted credential store (`credentials`)
//! - The loopback sign-in flow, token exchange, refresh and revocation
//!   (`auth`)
//! - HTTP client and logging setup
//!
//! ## Architecture
//! - Depends on `calnow-domain` for data types and `calnow-common` for
//!   encryption and owner-only files
//! - Contains all "impure" code (file system, network, browser)

pub mod auth;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod http;
pub mod observability;
pub mod testing;

// Re-export commonly used items
pub use auth::{AuthorizationCoordinator, RefreshOutcome};
pub use config::{AppPaths, AuthSettings};
pub use credentials::CredentialStore;
pub use errors::InfraError;
