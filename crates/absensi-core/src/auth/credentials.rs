use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::User;

/// Keychain service name
const SERVICE_NAME: &str = "absensi";

/// Keychain account holding the serialized session
const KEYRING_ACCOUNT: &str = "session";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to access credential storage: {0}")]
    Storage(String),

    #[error("Stored session is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for CredentialError {
    fn from(err: std::io::Error) -> Self {
        CredentialError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        CredentialError::Corrupt(err.to_string())
    }
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        CredentialError::Storage(err.to_string())
    }
}

/// Everything kept locally for a logged-in user. Cleared as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: Option<String>,
    /// Snapshot of the `user` object returned by login, kept verbatim.
    pub user: Option<serde_json::Value>,
    /// Device push-notification registration.
    pub push_token: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.user.is_none() && self.push_token.is_none()
    }

    /// Typed view of the user snapshot, if it parses.
    pub fn user(&self) -> Option<User> {
        self.user
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Process-wide slot for the current session.
///
/// Anyone may read; only login and the session client's recovery path
/// write. Last write wins.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<StoredSession, CredentialError>;

    fn save(&self, session: &StoredSession) -> Result<(), CredentialError>;

    /// Remove the token, user snapshot and push token together.
    fn clear(&self) -> Result<(), CredentialError>;

    fn access_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.load()?.access_token)
    }

    fn set_access_token(&self, token: &str) -> Result<(), CredentialError> {
        self.update(&|s: &mut StoredSession| s.access_token = Some(token.to_string()))
    }

    fn remove_access_token(&self) -> Result<(), CredentialError> {
        self.update(&|s: &mut StoredSession| s.access_token = None)
    }

    fn push_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.load()?.push_token)
    }

    fn set_push_token(&self, token: &str) -> Result<(), CredentialError> {
        self.update(&|s: &mut StoredSession| s.push_token = Some(token.to_string()))
    }

    fn set_user(&self, user: &serde_json::Value) -> Result<(), CredentialError> {
        self.update(&|s: &mut StoredSession| s.user = Some(user.clone()))
    }

    /// Read-modify-write of the whole snapshot.
    fn update(&self, f: &dyn Fn(&mut StoredSession)) -> Result<(), CredentialError> {
        let mut session = self.load()?;
        f(&mut session);
        session.updated_at = Some(Utc::now());
        self.save(&session)
    }
}

/// Volatile store, used for one-shot runs and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<StoredSession>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoredSession>, CredentialError> {
        self.inner
            .lock()
            .map_err(|_| CredentialError::Storage("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<StoredSession, CredentialError> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), CredentialError> {
        *self.lock()? = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.lock()? = StoredSession::default();
        Ok(())
    }

    /// Whole change under one lock, so writes to different slots never
    /// overwrite each other.
    fn update(&self, f: &dyn Fn(&mut StoredSession)) -> Result<(), CredentialError> {
        let mut session = self.lock()?;
        f(&mut *session);
        session.updated_at = Some(Utc::now());
        Ok(())
    }
}

/// JSON file in the cache directory. Survives restarts.
pub struct FileCredentialStore {
    cache_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<StoredSession, CredentialError> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(StoredSession::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, session: &StoredSession) -> Result<(), CredentialError> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// OS keychain entry holding the serialized session.
pub struct KeyringCredentialStore {
    account: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            account: KEYRING_ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Ok(Entry::new(SERVICE_NAME, &self.account)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<StoredSession, CredentialError> {
        match self.entry()?.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(keyring::Error::NoEntry) => Ok(StoredSession::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &StoredSession) -> Result<(), CredentialError> {
        let json = serde_json::to_string(session)?;
        self.entry()?.set_password(&json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                debug!(error = %e, "Failed to delete keychain entry");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_and_clear() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.access_token().unwrap(), None);

        store.set_access_token("abc").unwrap();
        store.set_push_token("fcm-1").unwrap();
        store
            .set_user(&serde_json::json!({"id": "u1", "name": "Sari", "role": "employee"}))
            .unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.access_token.as_deref(), Some("abc"));
        assert_eq!(session.push_token.as_deref(), Some("fcm-1"));
        assert!(session.updated_at.is_some());
        assert_eq!(session.user().map(|u| u.name), Some("Sari".to_string()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_keeps_other_slots() {
        let store = MemoryCredentialStore::new();
        store.set_push_token("fcm-1").unwrap();
        store.set_access_token("old").unwrap();
        store.set_access_token("new").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("new"));
        assert_eq!(store.push_token().unwrap().as_deref(), Some("fcm-1"));

        store.remove_access_token().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.push_token().unwrap().as_deref(), Some("fcm-1"));
    }

    #[test]
    fn test_concurrent_updates_to_different_slots_are_kept() {
        let store = std::sync::Arc::new(MemoryCredentialStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..200 {
                        if i % 2 == 0 {
                            store.set_access_token(&format!("tok-{}-{}", i, n)).unwrap();
                        } else {
                            store.set_push_token(&format!("fcm-{}-{}", i, n)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let session = store.load().unwrap();
        assert!(session.access_token.unwrap().ends_with("-199"));
        assert!(session.push_token.unwrap().ends_with("-199"));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("absensi");

        let store = FileCredentialStore::new(cache_dir.clone());
        assert!(store.load().unwrap().is_empty());
        store.set_access_token("tok").unwrap();
        store.set_push_token("fcm").unwrap();

        let reopened = FileCredentialStore::new(cache_dir.clone());
        assert_eq!(reopened.access_token().unwrap().as_deref(), Some("tok"));
        assert_eq!(reopened.push_token().unwrap().as_deref(), Some("fcm"));

        reopened.clear().unwrap();
        assert!(!cache_dir.join(SESSION_FILE).exists());
        assert!(store.load().unwrap().is_empty());
        // clearing twice is fine
        reopened.clear().unwrap();
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(SESSION_FILE), "not json").unwrap();
        let store = FileCredentialStore::new(temp_dir.path().to_path_buf());
        assert!(matches!(store.load(), Err(CredentialError::Corrupt(_))));
    }
}
