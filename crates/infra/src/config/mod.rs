//! Configuration resolution
//!
//! [`AppPaths`] decides where files live; [`AuthSettings`] holds the tunables
//! of the sign-in flow. Both are resolved once at startup and handed to the
//! components that need them.

pub mod paths;
pub mod settings;

// Re-export commonly used items
pub use paths::AppPaths;
pub use settings::AuthSettings;
