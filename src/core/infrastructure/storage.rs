//! Durable client-side key-value storage.
//!
//! Holds the optimization selection and the last-used monitoring preferences
//! across restarts. Loads never fail: absent or unreadable entries come back
//! as defaults.

use crate::core::domain::{
    error::{BGreenError, BGreenResult},
    model::{monitoring_config::MonitoringPreferences, selection::OptimizationSelection},
};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Key of the persisted [`OptimizationSelection`].
pub const SELECTION_KEY: &str = "optimizationState";
/// Key of the persisted [`MonitoringPreferences`].
pub const PREFERENCES_KEY: &str = "monitoringPreferences";

/// A string key-value store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, `Ok(None)` if the key was never written.
    async fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn write(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &str, value: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.path_for(key);
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &target).await
    }
}

/// In-process store, for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to the persisted client state.
#[derive(Debug)]
pub struct LocalState<S> {
    store: S,
}

impl<S: KeyValueStore> LocalState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Overwrites the saved selection.
    pub async fn save_selection(&self, selection: &OptimizationSelection) -> BGreenResult<()> {
        self.save(SELECTION_KEY, selection).await
    }

    /// The saved selection, or an empty one if absent or unparsable.
    pub async fn load_selection(&self) -> OptimizationSelection {
        self.load(SELECTION_KEY).await
    }

    pub async fn save_preferences(&self, preferences: &MonitoringPreferences) -> BGreenResult<()> {
        self.save(PREFERENCES_KEY, preferences).await
    }

    pub async fn load_preferences(&self) -> MonitoringPreferences {
        self.load(PREFERENCES_KEY).await
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> BGreenResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| BGreenError::Storage(format!("cannot serialize '{}': {}", key, e)))?;
        self.store
            .write(key, &json)
            .await
            .map_err(|e| BGreenError::Storage(format!("cannot write '{}': {}", key, e)))?;
        debug!(key, "saved local state");
        Ok(())
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.store.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "cannot read local state, using defaults");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "corrupt local state, using defaults");
            T::default()
        })
    }
}
