use parking_lot::RwLock;
use schedsync_core::{AuthError, CredentialBackend, CredentialsConfig};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Keyring service name used for stored entries.
pub const KEYRING_SERVICE: &str = "schedsync";

/// Read-only key-value store holding the site's auth state.
///
/// Implementations return `Ok(None)` when the key is absent; `Err` is
/// reserved for a store that cannot be read at all.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Build the store selected in the config.
pub fn open_store(config: &CredentialsConfig) -> Arc<dyn CredentialStore> {
    match config.backend {
        CredentialBackend::File => Arc::new(FileStore::new(&config.path)),
        CredentialBackend::Keyring => Arc::new(KeyringStore::new(KEYRING_SERVICE)),
    }
}

/// File-backed store: one JSON object mapping storage keys to values.
///
/// The file is a snapshot of the site's local storage and is re-read on
/// every lookup so a refreshed export is picked up by the next run.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Option<HashMap<String, serde_json::Value>>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| AuthError::StorageError(format!("{}: {}", self.path.display(), e)))?;

        let entries = serde_json::from_str(&json)
            .map_err(|e| AuthError::StorageError(format!("{}: {}", self.path.display(), e)))?;

        Ok(Some(entries))
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let Some(mut entries) = self.read_all()? else {
            tracing::debug!("Storage file {:?} does not exist", self.path);
            return Ok(None);
        };

        // Local storage only holds strings, but accept an already-parsed
        // document as well.
        let value = match entries.remove(key) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        Ok(value)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// System keyring store, one entry per storage key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let entry = keyring::Entry::new(&self.service, key)
            .map_err(|e| AuthError::StorageError(e.to_string()))?;

        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::StorageError(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}

/// In-memory store, for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.insert(key, value);
        store
    }

    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.entries.write().insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
