//! File-system layout
//!
//! ## Locations
//! - Data directory: `%APPDATA%\CalendarNow` on Windows,
//!   `~/.local/share/CalendarNow` elsewhere. Holds `credentials.json`,
//!   `client_config.json` and `.key`.
//! - Install directory: the directory of the running executable. A
//!   `client_config.json` shipped next to the binary takes precedence.
//! - Resource directory: `<install>/resources`, holding the bundled
//!   `credentials/client_config.json`.
//!
//! ## Environment Variables
//! - `CALNOW_DATA_DIR`: overrides the data directory
//! - `CALNOW_RESOURCE_DIR`: overrides the resource directory

use std::env;
use std::path::{Path, PathBuf};

use calnow_domain::constants::{
    APP_DIR_NAME, BUNDLED_CLIENT_CONFIG_PATH, CLIENT_CONFIG_FILE_NAME, CREDENTIALS_FILE_NAME,
    KEY_FILE_NAME,
};
use calnow_domain::{CalNowError, Result};

pub const DATA_DIR_ENV: &str = "CALNOW_DATA_DIR";
pub const RESOURCE_DIR_ENV: &str = "CALNOW_RESOURCE_DIR";

const RESOURCE_DIR_NAME: &str = "resources";

/// Resolved directories the credential store reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
    install_dir: PathBuf,
    resource_dir: PathBuf,
}

impl AppPaths {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        install_dir: impl Into<PathBuf>,
        resource_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            install_dir: install_dir.into(),
            resource_dir: resource_dir.into(),
        }
    }

    /// Resolve the platform layout, honoring the environment overrides.
    ///
    /// # Errors
    /// Returns `CalNowError::Config` if neither an override nor a home
    /// directory is available, or the executable location cannot be
    /// determined.
    pub fn from_platform() -> Result<Self> {
        let data_dir = match env_path(DATA_DIR_ENV) {
            Some(dir) => dir,
            None => platform_data_dir()?,
        };

        let exe = env::current_exe()
            .map_err(|e| CalNowError::Config(format!("cannot locate executable: {e}")))?;
        let install_dir = exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            CalNowError::Config("executable has no parent directory".to_string())
        })?;

        let resource_dir =
            env_path(RESOURCE_DIR_ENV).unwrap_or_else(|| install_dir.join(RESOURCE_DIR_NAME));

        tracing::debug!(
            data_dir = %data_dir.display(),
            install_dir = %install_dir.display(),
            "resolved application paths"
        );

        Ok(Self { data_dir, install_dir, resource_dir })
    }

    /// Lay everything out under one directory.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            install_dir: root.join("install"),
            resource_dir: root.join("install").join(RESOURCE_DIR_NAME),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Encrypted credential document.
    pub fn credentials_file(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE_NAME)
    }

    /// Per-user client registration (legacy location, also where the setup
    /// flow saves).
    pub fn client_config_file(&self) -> PathBuf {
        self.data_dir.join(CLIENT_CONFIG_FILE_NAME)
    }

    pub fn key_file(&self) -> PathBuf {
        self.data_dir.join(KEY_FILE_NAME)
    }

    pub fn installed_client_config(&self) -> PathBuf {
        self.install_dir.join(CLIENT_CONFIG_FILE_NAME)
    }

    pub fn bundled_client_config(&self) -> PathBuf {
        self.resource_dir.join(BUNDLED_CLIENT_CONFIG_PATH)
    }

    /// Client registration candidates in resolution order.
    pub fn client_config_candidates(&self) -> [PathBuf; 3] {
        [self.installed_client_config(), self.bundled_client_config(), self.client_config_file()]
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|value| !value.is_empty()).map(PathBuf::from)
}

#[cfg(windows)]
fn platform_data_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| CalNowError::Config("APPDATA directory unavailable".to_string()))
}

#[cfg(not(windows))]
fn platform_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_DIR_NAME))
        .ok_or_else(|| CalNowError::Config("home directory unavailable".to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn rooted_layout_derives_file_names() {
        let paths = AppPaths::rooted_at("/tmp/calnow-test");

        assert_eq!(paths.credentials_file(), Path::new("/tmp/calnow-test/data/credentials.json"));
        assert_eq!(paths.key_file(), Path::new("/tmp/calnow-test/data/.key"));
        assert_eq!(
            paths.bundled_client_config(),
            Path::new("/tmp/calnow-test/install/resources/credentials/client_config.json")
        );
    }

    #[test]
    fn candidates_are_ordered_install_bundled_user() {
        let paths = AppPaths::new("/data", "/opt/app", "/opt/app/resources");
        let [first, second, third] = paths.client_config_candidates();

        assert_eq!(first, Path::new("/opt/app/client_config.json"));
        assert_eq!(second, Path::new("/opt/app/resources/credentials/client_config.json"));
        assert_eq!(third, Path::new("/data/client_config.json"));
    }

    #[test]
    fn environment_overrides_data_and_resource_dirs() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(DATA_DIR_ENV, "/custom/data");
        env::set_var(RESOURCE_DIR_ENV, "/custom/resources");

        let paths = AppPaths::from_platform().unwrap();

        env::remove_var(DATA_DIR_ENV);
        env::remove_var(RESOURCE_DIR_ENV);

        assert_eq!(paths.data_dir(), Path::new("/custom/data"));
        assert_eq!(paths.resource_dir(), Path::new("/custom/resources"));
    }

    #[cfg(not(windows))]
    #[test]
    fn default_data_dir_lives_under_local_share() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var(DATA_DIR_ENV);

        if let Ok(paths) = AppPaths::from_platform() {
            assert!(paths.data_dir().ends_with(".local/share/CalendarNow"));
        }
    }
}
