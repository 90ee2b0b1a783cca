//! Application constants
//!
//! Centralized location for the domain-level constants of the
//! authentication core.

// Storage layout
pub const APP_DIR_NAME: &str = "CalendarNow";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";
pub const CLIENT_CONFIG_FILE_NAME: &str = "client_config.json";
pub const KEY_FILE_NAME: &str = ".key";
pub const BUNDLED_CLIENT_CONFIG_PATH: &str = "credentials/client_config.json";

// Provider endpoints (Google)
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_REVOCATION_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";
pub const DEFAULT_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";
pub const DEFAULT_PROJECT_ID: &str = "calendar-now";

pub const DEFAULT_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

// Loopback callback
pub const CALLBACK_HOST: &str = "127.0.0.1";
pub const CALLBACK_PORT: u16 = 8080;
pub const CALLBACK_PATH: &str = "/callback";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

// Timing
pub const LISTENER_BIND_ATTEMPTS: u32 = 5;
pub const LISTENER_BIND_RETRY_DELAY_MS: u64 = 2000;
pub const AUTHORIZATION_TIMEOUT_SECS: u64 = 120;
pub const CALLBACK_POLL_INTERVAL_MS: u64 = 500;
pub const HTTP_TIMEOUT_SECS: u64 = 30;
pub const EXPIRY_SKEW_SECS: i64 = 60;
