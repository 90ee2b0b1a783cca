//! Owner-only file primitives
//!
//! Secrets (the encryption key, the encrypted credential document) are
//! written atomically through a temporary file in the destination directory
//! and restricted to the owning user. On platforms without POSIX permission
//! bits the restriction step is a no-op.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{CommonError, CommonResult};

/// Permission bits for secret files on unix.
#[cfg(unix)]
pub const OWNER_ONLY_MODE: u32 = 0o600;

/// Atomically write `contents` to `path` with owner-only permissions.
///
/// Parent directories are created as needed. The file is either fully
/// replaced or left untouched.
///
/// # Errors
/// Returns `CommonError::Persistence` if the directory cannot be created or
/// the temporary file cannot be written or renamed into place.
pub fn write_private(path: &Path, contents: &[u8]) -> CommonResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| CommonError::persistence_during("create_dir", e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| CommonError::persistence_during("create_temp", e.to_string()))?;
    restrict_to_owner(tmp.path())?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CommonError::persistence_during("write", e.to_string()))?;

    tmp.persist(path).map_err(|e| CommonError::persistence_during("rename", e.error.to_string()))?;
    restrict_to_owner(path)
}

/// Restrict `path` to read/write by the owning user.
///
/// # Errors
/// Returns `CommonError::Persistence` if the permissions cannot be changed.
#[cfg(unix)]
pub fn restrict_to_owner(path: &Path) -> CommonResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(OWNER_ONLY_MODE))
        .map_err(|e| CommonError::persistence_during("chmod", e.to_string()))
}

#[cfg(not(unix))]
pub fn restrict_to_owner(_path: &Path) -> CommonResult<()> {
    Ok(())
}

/// Whether `path` is readable and writable only by its owner.
///
/// Always true on platforms without POSIX permission bits.
#[cfg(unix)]
pub fn is_owner_only(path: &Path) -> CommonResult<bool> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o777 == OWNER_ONLY_MODE)
}

#[cfg(not(unix))]
pub fn is_owner_only(path: &Path) -> CommonResult<bool> {
    fs::metadata(path)?;
    Ok(true)
}
