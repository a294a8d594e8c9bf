//! JSON snapshot file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.santa/
//!   participants.json   (registry snapshot — mode 0600)
//!   seed.yaml           (optional roster + attribute seed)
//! ```
//!
//! # API pattern
//!
//! Path helpers come in two forms:
//! - `fn_at(home: &Path)` — explicit home; used in tests with `TempDir`
//! - `fn()` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::snapshot::RegistrySnapshot;

pub const SNAPSHOT_FILE: &str = "participants.json";
pub const SEED_FILE: &str = "seed.yaml";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.santa/` — pure, no I/O.
pub fn santa_root_at(home: &Path) -> PathBuf {
    home.join(".santa")
}

/// `<home>/.santa/participants.json` — pure, no I/O.
pub fn snapshot_path_at(home: &Path) -> PathBuf {
    santa_root_at(home).join(SNAPSHOT_FILE)
}

/// `snapshot_path_at` convenience wrapper.
pub fn snapshot_path() -> Result<PathBuf, StoreError> {
    Ok(snapshot_path_at(&home()?))
}

/// `<home>/.santa/seed.yaml` — pure, no I/O.
pub fn seed_path_at(home: &Path) -> PathBuf {
    santa_root_at(home).join(SEED_FILE)
}

pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a snapshot from `path`.
///
/// Returns `Ok(None)` if the file does not exist and `StoreError::Parse`
/// (with path context) if it is malformed or violates a registry invariant.
pub fn load_snapshot(path: &Path) -> Result<Option<RegistrySnapshot>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write `snapshot` to `path`.
///
/// Write flow: serialize → `<file>.tmp` sibling → `chmod 0600` → `rename`.
/// The parent directory is created with mode `0700` when missing.
pub fn save_snapshot(path: &Path, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| SNAPSHOT_FILE.to_string());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));

    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Create `dir` (and parents) when missing; the leaf gets mode 0700.
pub fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    set_dir_permissions(dir)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
