use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::errors::CoreError;

use super::encryption::{self, KdfParams, StoreKey};
use super::format::{self, StoreHeader};

/// Well-known keys used by the services.
pub mod keys {
    pub const AUTH_TOKEN: &str = "auth.token";
    pub const USER_NAME: &str = "user.name";
    pub const USER_EMAIL: &str = "user.email";
    pub const GOAL_STATE: &str = "goal.state";
    pub const PIN_HASH: &str = "pin.hash";
    pub const PIN_ATTEMPTS: &str = "pin.attempts";
    pub const LOCK_ENABLED: &str = "lock.enabled";
}

/// Durable per-installation key-value store for session data, goal state,
/// the PIN secret and attempt counters.
///
/// Implementations must persist each `set`/`remove` before returning so a
/// record written by one call survives a process restart.
pub trait SecureStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// Read a JSON-encoded record. A missing key yields `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(store: &dyn SecureStore, key: &str) -> Result<Option<T>, CoreError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::Deserialization(format!("Corrupt record '{key}': {e}"))),
        None => Ok(None),
    }
}

/// Write a whole record as one JSON value under `key`.
pub fn save_json<T: Serialize>(store: &dyn SecureStore, key: &str, value: &T) -> Result<(), CoreError> {
    let raw = serde_json::to_string(value)
        .map_err(|e| CoreError::Serialization(format!("Failed to encode record '{key}': {e}")))?;
    store.set(key, &raw)
}

// ── In-memory ───────────────────────────────────────────────────────

/// Non-durable store, used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        Ok(())
    }
}

// ── Encrypted file ──────────────────────────────────────────────────

/// Key-value store kept in a single encrypted file (native only).
///
/// Flow on every write: map → bincode → AES-256-GCM(fresh nonce) → EXTK
/// container → temp file → rename over the old file. The Argon2id key is
/// derived once in `open` and reused for the lifetime of the store.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct EncryptedFileStore {
    path: std::path::PathBuf,
    key: StoreKey,
    entries: Mutex<BTreeMap<String, String>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl EncryptedFileStore {
    /// Open (or prepare to create) a store at `path` with default KDF params.
    pub fn open(path: impl Into<std::path::PathBuf>, passphrase: &str) -> Result<Self, CoreError> {
        Self::open_with_params(path, passphrase, KdfParams::default())
    }

    /// Open with explicit KDF params. For an existing file the params stored
    /// in its header win; `params` only applies when a new file is created.
    pub fn open_with_params(
        path: impl Into<std::path::PathBuf>,
        passphrase: &str,
        params: KdfParams,
    ) -> Result<Self, CoreError> {
        let path = path.into();

        if path.exists() {
            let bytes = std::fs::read(&path)?;
            let (header, ciphertext) = format::read_container(&bytes)?;
            let key = StoreKey::derive(passphrase, header.salt, header.kdf_params)?;
            let plaintext = key.open(&header.nonce, ciphertext)?;
            let entries: BTreeMap<String, String> = bincode::deserialize(&plaintext)
                .map_err(|e| CoreError::Deserialization(format!("Failed to decode store: {e}")))?;
            log::debug!("Opened encrypted store with {} entries", entries.len());
            return Ok(Self {
                path,
                key,
                entries: Mutex::new(entries),
            });
        }

        let key = StoreKey::derive(passphrase, encryption::generate_salt()?, params)?;
        Ok(Self {
            path,
            key,
            entries: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), CoreError> {
        let plaintext = bincode::serialize(entries)
            .map_err(|e| CoreError::Serialization(format!("Failed to encode store: {e}")))?;
        let (nonce, ciphertext) = self.key.seal(&plaintext)?;
        let header = StoreHeader {
            version: format::CURRENT_VERSION,
            kdf_params: *self.key.params(),
            salt: *self.key.salt(),
            nonce,
        };
        let bytes = format::write_container(&header, &ciphertext);

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply `edit` to the map and persist it. The in-memory map is only
    /// replaced once the file write succeeded.
    fn update(&self, edit: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.clone();
        edit(&mut next);
        self.persist(&next).inspect_err(|e| log::error!("Failed to persist store: {e}"))?;
        *entries = next;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SecureStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.update(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.update(|m| {
            m.remove(key);
        })
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.update(BTreeMap::clear)
    }
}
