//! JSON key-value preference storage.
//!
//! All persisted state lives in a flat key-value store with
//! JSON-encoded values -- user settings under [`keys::USER_SETTINGS`],
//! session history under [`keys::SESSION_HISTORY`]. Durability is best
//! effort: a failed write degrades the feature that needed it, never
//! the running timer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

/// Well-known store keys.
pub mod keys {
    pub const USER_SETTINGS: &str = "userSettings";
    pub const SESSION_HISTORY: &str = "sessionHistory";
}

/// Returns `~/.config/focusshield[-dev]/` based on FOCUSSHIELD_ENV.
///
/// Set FOCUSSHIELD_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, PersistenceError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSSHIELD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusshield-dev")
    } else {
        base_dir.join("focusshield")
    };

    std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Flat string key-value store. Values are JSON text; use
/// [`get_json`] / [`set_json`] for typed access.
pub trait PreferenceStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set_raw(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Decode the value stored under `key`, if any.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn PreferenceStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    match store.get_raw(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode `value` and store it under `key`.
pub fn set_json<T: Serialize>(
    store: &dyn PreferenceStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(value)?;
    store.set_raw(key, &raw)
}

/// File-backed store: one `<key>.json` file per key under a directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open the default store under the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn open() -> Result<Self, PersistenceError> {
        Ok(Self { dir: data_dir()? })
    }

    /// Open a store rooted at an explicit directory (used by tests).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PreferenceStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries().remove(key);
        Ok(())
    }
}
