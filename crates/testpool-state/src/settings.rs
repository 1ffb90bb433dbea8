//! Process-wide display settings, persisted as one flat JSON file.
//!
//! Load returns defaults when the file is missing or unparseable (logged,
//! never fatal); save overwrites the file wholesale. No versioning, no
//! partial merge.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A user-defined column backed by a record metadata key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomColumn {
    pub name: String,
    /// Metadata key the column reads from.
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: ColumnKind,
}

/// Rendering kind for a custom column.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Date,
}

/// Display configuration: custom columns, hidden columns, column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub custom_columns: Vec<CustomColumn>,
    #[serde(default)]
    pub hidden_columns: Vec<String>,
    #[serde(default)]
    pub column_order: Vec<String>,
}

/// Settings held in memory behind a lock, mirrored to a JSON file.
///
/// Writers are serialized by the lock: `update` swaps the in-memory state
/// and persists under the same write guard.
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing or corrupt file degrades to
    /// defaults.
    pub fn load(path: &Path) -> Self {
        let current = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(?path, %err, "settings file unparseable, using defaults");
                    Settings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no settings file, using defaults");
                Settings::default()
            }
            Err(err) => {
                warn!(?path, %err, "settings file unreadable, using defaults");
                Settings::default()
            }
        };
        Self {
            path: path.to_path_buf(),
            current: RwLock::new(current),
        }
    }

    /// Snapshot the current settings.
    pub fn get(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings wholesale and persist. A persist failure is
    /// logged and degrades to in-memory-only, never propagated.
    pub fn update(&self, settings: Settings) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        match serde_json::to_vec_pretty(&*guard) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&self.path, bytes) {
                    warn!(path = ?self.path, %err, "failed to persist settings");
                }
            }
            Err(err) => warn!(%err, "failed to serialize settings"),
        }
    }
}
