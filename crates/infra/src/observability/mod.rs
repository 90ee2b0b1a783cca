//! Logging setup and helpers
//!
//! Library code logs through `tracing` macros. Binaries (and tests that want
//! output) call [`init_tracing`] once; later calls are no-ops.
//!
//! Authorization codes and tokens must never reach a log line in full. Pass
//! them through [`redact`] first.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const VISIBLE_PREFIX: usize = 6;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"calnow_infra=info"`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Shorten a secret to a loggable prefix.
pub fn redact(secret: &str) -> String {
    match secret.char_indices().nth(VISIBLE_PREFIX) {
        Some((idx, _)) => format!("{}...", &secret[..idx]),
        None if secret.is_empty() => String::new(),
        None => "...".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_short_prefix_only() {
        assert_eq!(redact("4/0AbCdEfGhIjKlMnOp"), "4/0AbC...");
        assert_eq!(redact("short"), "...");
        assert_eq!(redact(""), "");
    }

    #[test]
    fn init_tracing_is_idempotent() {
        let _ = init_tracing("warn");
        assert!(!init_tracing("warn"));
    }
}
