//! Common error type for the shared primitives
//!
//! `CommonError` covers the handful of failure patterns the primitives in
//! this crate can hit. Callers in other crates convert it into their own
//! error types at the boundary.

use std::fmt;

/// Result alias for operations in this crate.
pub type CommonResult<T> = Result<T, CommonError>;

/// Failure patterns shared by the crypto and file primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Invalid key material or cipher configuration
    Crypto { message: String },

    /// Serialization or deserialization errors
    Serialization { message: String, format: Option<String> },

    /// Data persistence errors (file I/O)
    Persistence { message: String, operation: Option<String> },

    /// Internal errors that shouldn't normally occur
    Internal { message: String, context: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crypto { message } => write!(f, "Cryptographic error: {message}"),
            Self::Serialization { message, format } => match format {
                Some(format) => write!(f, "{format} serialization error: {message}"),
                None => write!(f, "Serialization error: {message}"),
            },
            Self::Persistence { message, operation } => match operation {
                Some(operation) => write!(f, "Persistence error during {operation}: {message}"),
                None => write!(f, "Persistence error: {message}"),
            },
            Self::Internal { message, context } => match context {
                Some(context) => write!(f, "Internal error ({context}): {message}"),
                None => write!(f, "Internal error: {message}"),
            },
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    /// Create a cryptographic error
    pub fn crypto<S: Into<String>>(message: S) -> Self {
        Self::Crypto { message: message.into() }
    }

    /// Create a serialization error tagged with its format
    pub fn serialization_format<F: Into<String>, S: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence { message: message.into(), operation: None }
    }

    /// Create a persistence error naming the operation that failed
    pub fn persistence_during<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::Persistence { message: message.into(), operation: Some(operation.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }
}

// Standard conversions from common error types
impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}
