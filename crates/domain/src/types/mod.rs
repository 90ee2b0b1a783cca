//! Domain types and models

pub mod credential;
pub mod registration;

pub use credential::{parse_scope_string, Credential};
pub use registration::{ClientConfigDocument, ClientRegistration, ClientSecrets, RegistrationKind};
