//! Conversion of transport errors into domain errors.
//!
//! Storage failures have their own path (`credentials::StoreError`) and are
//! collapsed at the store's public surface, so only `reqwest` errors cross
//! into `CalNowError` here.

use calnow_domain::CalNowError;
use reqwest::Error as HttpError;

/// Error newtype that keeps third-party conversions on the infrastructure
/// side of the crate boundary.
#[derive(Debug)]
pub struct InfraError(pub CalNowError);

impl From<InfraError> for CalNowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        Self(classify(&err))
    }
}

fn classify(err: &HttpError) -> CalNowError {
    if err.is_timeout() {
        return CalNowError::Network("request to identity provider timed out".into());
    }
    if err.is_connect() {
        return CalNowError::Network(format!("identity provider unreachable: {err}"));
    }
    if err.is_builder() {
        return CalNowError::Config(format!("invalid endpoint URL: {err}"));
    }

    match err.status() {
        Some(status) if status == reqwest::StatusCode::UNAUTHORIZED => {
            CalNowError::Auth(format!("identity provider answered {status}"))
        }
        Some(status) => CalNowError::Network(format!("identity provider answered {status}")),
        None => CalNowError::Network(err.to_string()),
    }
}
