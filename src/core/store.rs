//! Synchronous string-keyed settings storage.
//!
//! Everything the panels persist — the primary API key, per-capability
//! keys, and enabled flags — goes through the [`SettingsStore`] contract.
//! The production implementation keeps one keyring entry per namespaced
//! key; tests and `--env-only` runs use the in-memory store instead.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::core::constants::{API_KEY_ENV_VAR, KEYRING_SERVICE};

/// Namespaced keys understood by the rest of the application.
pub mod keys {
    /// Primary bearer credential for the chat-completion API.
    pub const API_KEY: &str = "api-key";

    /// Enabled flag for a capability, stored as `"true"` / `"false"`.
    pub fn capability_enabled(id: &str) -> String {
        format!("mcp.{id}.enabled")
    }

    /// Saved credential for a capability.
    pub fn capability_key(id: &str) -> String {
        format!("mcp.{id}.key")
    }
}

/// Describes failures when reading or writing the settings backend.
///
/// Recoverable errors indicate that the credential backend was
/// temporarily unavailable (for example when the keychain service is
/// locked). Permanent errors surface the underlying cause directly.
#[derive(Debug)]
pub struct StoreError {
    key: String,
    source: keyring::Error,
}

impl StoreError {
    fn new(key: &str, source: keyring::Error) -> Self {
        Self {
            key: key.to_string(),
            source,
        }
    }

    /// Returns true when the error represents a temporary outage of the
    /// platform keyring backend.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.source,
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_)
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "settings entry '{}': {}", self.key, self.source)
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Synchronous, string-keyed persistence for settings and credentials.
///
/// Single-actor access model: no transactions or concurrent-writer
/// arbitration, every mutation happens on one control flow per user
/// action.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// System-keyring backed store: one entry per namespaced key.
pub struct KeyringStore {
    service: &'static str,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE,
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(self.service, key).map_err(|err| StoreError::new(key, err))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => {
                let err = StoreError::new(key, err);
                tracing::warn!(key, recoverable = err.is_recoverable(), "keyring read failed");
                Err(err)
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|err| StoreError::new(key, err))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StoreError::new(key, err)),
        }
    }
}

/// In-process store used by tests and keyring-less (`--env-only`) runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Decorator that falls back to an environment variable for the primary
/// API key when the inner store has no entry for it.
///
/// Writes and removals always target the inner store, so saving a key
/// from the settings panel shadows the environment value from then on.
pub struct EnvFallbackStore {
    inner: Arc<dyn SettingsStore>,
    var: &'static str,
}

impl EnvFallbackStore {
    pub fn new(inner: Arc<dyn SettingsStore>) -> Self {
        Self {
            inner,
            var: API_KEY_ENV_VAR,
        }
    }

    #[cfg(test)]
    fn with_var(inner: Arc<dyn SettingsStore>, var: &'static str) -> Self {
        Self { inner, var }
    }
}

impl SettingsStore for EnvFallbackStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(value) = self.inner.get(key)? {
            return Ok(Some(value));
        }
        if key == keys::API_KEY {
            if let Ok(value) = std::env::var(self.var) {
                if !value.is_empty() {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        assert_eq!(store.get("api-key").unwrap(), None);

        store.set("api-key", "sk-test").unwrap();
        assert_eq!(store.get("api-key").unwrap().as_deref(), Some("sk-test"));

        store.remove("api-key").unwrap();
        assert_eq!(store.get("api-key").unwrap(), None);
    }

    #[test]
    fn removing_a_missing_key_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.remove("mcp.notion.key").is_ok());
    }

    #[test]
    fn capability_keys_are_namespaced_by_id() {
        assert_eq!(keys::capability_enabled("notion"), "mcp.notion.enabled");
        assert_eq!(keys::capability_key("elevenlabs"), "mcp.elevenlabs.key");
    }

    #[test]
    fn env_fallback_only_covers_the_primary_key() {
        let inner = Arc::new(MemoryStore::new());
        let store = EnvFallbackStore::with_var(inner.clone(), "CAUSERIE_TEST_API_KEY");

        std::env::set_var("CAUSERIE_TEST_API_KEY", "sk-env");
        assert_eq!(
            store.get(keys::API_KEY).unwrap().as_deref(),
            Some("sk-env")
        );
        assert_eq!(store.get("mcp.notion.key").unwrap(), None);

        // A stored key shadows the environment.
        inner.set(keys::API_KEY, "sk-stored").unwrap();
        assert_eq!(
            store.get(keys::API_KEY).unwrap().as_deref(),
            Some("sk-stored")
        );
        std::env::remove_var("CAUSERIE_TEST_API_KEY");
    }
}
