//! Primitives shared across CalendarNow crates.
//!
//! Nothing in this crate knows about OAuth; it provides the building blocks
//! the credential store is assembled from.
//!
//! - [`crypto`]: AES-256-GCM encryption with a per-installation key
//! - [`security`]: owner-only, atomically written files
//! - [`error`]: the shared `CommonError` type

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod crypto;
pub mod error;
pub mod security;

// Re-export commonly used types
pub use crypto::{EncryptedData, EncryptionService};
pub use error::{CommonError, CommonResult};
pub use security::{is_owner_only, restrict_to_owner, write_private};
