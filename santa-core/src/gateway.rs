//! Persistence gateway: the post-commit hook between the registry and a
//! storage mechanism.
//!
//! Failures come back as `Err` values; the caller decides whether they are
//! fatal. The exchange treats a failed save as a warning.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::snapshot::RegistrySnapshot;
use crate::store;

pub trait PersistenceGateway: Send + Sync {
    /// The last saved snapshot, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<RegistrySnapshot>, StoreError>;

    /// Persist the full registry state.
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError>;
}

/// JSON file on disk, written atomically.
#[derive(Debug, Clone)]
pub struct FileGateway {
    path: PathBuf,
}

impl FileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Gateway for `<home>/.santa/participants.json`.
    pub fn at_home(home: &Path) -> Self {
        Self::new(store::snapshot_path_at(home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceGateway for FileGateway {
    fn load(&self) -> Result<Option<RegistrySnapshot>, StoreError> {
        store::load_snapshot(&self.path)
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
        store::save_snapshot(&self.path, snapshot)?;
        tracing::debug!(path = %self.path.display(), "registry snapshot saved");
        Ok(())
    }
}

/// In-memory gateway for tests and ephemeral runs.
///
/// [`MemoryGateway::set_failing`] makes every subsequent `save` fail, which is
/// how the non-fatal persistence path is exercised.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    saved: Option<RegistrySnapshot>,
    saves: usize,
    failing: bool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-saved snapshot.
    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                saved: Some(snapshot),
                saves: 0,
                failing: false,
            }),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }

    pub fn last_saved(&self) -> Option<RegistrySnapshot> {
        self.inner.lock().saved.clone()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self) -> Result<Option<RegistrySnapshot>, StoreError> {
        Ok(self.inner.lock().saved.clone())
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        if state.failing {
            return Err(StoreError::Unavailable("memory gateway set to fail".into()));
        }
        state.saved = Some(snapshot.clone());
        state.saves += 1;
        Ok(())
    }
}
