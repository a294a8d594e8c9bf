//! Seed configuration: the fixed roster and attribute list for one event.
//!
//! ```yaml
//! roster:
//!   - Ann
//!   - Bob
//! attributes:
//!   - Red
//!   - Blue
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, SnapshotError, StoreError};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    pub roster: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl SeedConfig {
    /// The roster and colours of the original office exchange.
    pub fn builtin() -> Self {
        let roster = [
            "Віка", "Коля", "Дана", "Костя", "Люда", "Ярік", "Олена", "Даня", "Славік", "Настя",
        ];
        let attributes = [
            "Чорний 🖤",
            "Червоний ❤️",
            "Синій 💙",
            "Рожевий 💖",
            "Жовтий 💛",
            "Зелений 💚",
            "Білий 🤍",
            "Фіолетовий 💜",
            "Помаранчевий 🧡",
            "Коричневий 🤎",
        ];
        Self {
            roster: roster.iter().map(|s| s.to_string()).collect(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse a YAML seed file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_yaml::from_str(&contents).map_err(|e| StoreError::Seed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` when given, otherwise fall back to [`SeedConfig::builtin`].
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, StoreError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn to_yaml(&self) -> Result<String, StoreError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Build a fresh registry. Names and tokens are trimmed.
    pub fn into_registry(self) -> Result<Registry, SnapshotError> {
        Registry::from_seed(
            self.roster.into_iter().map(|n| n.trim().to_string()),
            self.attributes.into_iter().map(|a| a.trim().to_string()),
        )
    }
}
