//! # CalendarNow Domain
//!
//! Data types shared by the authentication core.
//!
//! This crate contains:
//! - Credential and client registration models
//! - Domain error types and Result definitions
//! - The authentication failure taxonomy surfaced to the UI
//! - Domain constants (file names, default endpoints, timing)
//!
//! ## Architecture
//! - No dependencies on other CalendarNow crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
