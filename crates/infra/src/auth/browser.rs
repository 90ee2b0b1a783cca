//! Opening the authorization URL in the user's browser.

use async_trait::async_trait;
use calnow_domain::{CalNowError, Result};
use tracing::debug;

/// Something that can navigate the user to the authorization URL.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Open `url`. Returning does not mean the user has acted on it.
    async fn open(&self, url: &str) -> Result<()>;
}

/// Default system browser, via the platform opener.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

#[async_trait]
impl BrowserLauncher for SystemBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        tokio::task::spawn_blocking(move || open::that(url))
            .await
            .map_err(|e| CalNowError::Internal(format!("browser task failed: {e}")))?
            .map_err(|e| CalNowError::Io(format!("failed to open browser: {e}")))?;

        debug!("authorization URL opened in system browser");
        Ok(())
    }
}
