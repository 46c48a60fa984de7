//! Persisted credential record storage.
//!
//! The session treats credentials as one atomic record: replaced whole on a
//! successful authentication, cleared whole on logout. Implementations must
//! preserve that all-or-nothing shape; the keychain store does it by
//! keeping the entire record in a single keychain entry.

use std::sync::Mutex;

use keyring::Entry;
use tracing::debug;

use quillpad_domain::{Credentials, QuillpadError, Result};

/// Storage for the session's credential record.
///
/// Pure state: get/set/clear, nothing else. Errors are `Storage` faults.
pub trait CredentialStore: Send + Sync {
    /// Load the persisted record, `None` when nothing is stored.
    ///
    /// # Errors
    /// `Storage` when the backing store cannot be read.
    fn load(&self) -> Result<Option<Credentials>>;

    /// Atomically replace the persisted record.
    ///
    /// # Errors
    /// `Storage` when the backing store cannot be written.
    fn store(&self, credentials: &Credentials) -> Result<()>;

    /// Atomically clear the persisted record. Clearing an empty store is a
    /// no-op, not an error.
    ///
    /// # Errors
    /// `Storage` when the backing store cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Credential store backed by the platform keychain (macOS Keychain,
/// Windows Credential Manager, Secret Service on Linux).
///
/// The whole record is serialized to JSON and kept under one
/// (service, account) entry, so replace and clear stay atomic.
pub struct KeychainCredentialStore {
    service: String,
    account: String,
}

impl KeychainCredentialStore {
    /// Create a store for the given keychain service/account pair
    /// (e.g. `"Quillpad"` / `"session"`).
    #[must_use]
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service: service.into(), account: account.into() }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account)
            .map_err(|e| QuillpadError::Storage(format!("keychain entry unavailable: {e}")))
    }
}

impl CredentialStore for KeychainCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        match self.entry()?.get_password() {
            Ok(raw) => {
                let credentials = serde_json::from_str(&raw).map_err(|e| {
                    QuillpadError::Storage(format!("stored credentials unreadable: {e}"))
                })?;
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(QuillpadError::Storage(format!("keychain read failed: {e}"))),
        }
    }

    fn store(&self, credentials: &Credentials) -> Result<()> {
        let raw = serde_json::to_string(credentials)
            .map_err(|e| QuillpadError::Storage(format!("credentials unserializable: {e}")))?;
        self.entry()?
            .set_password(&raw)
            .map_err(|e| QuillpadError::Storage(format!("keychain write failed: {e}")))?;
        debug!(service = %self.service, "credentials stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "credentials cleared");
                Ok(())
            }
            Err(e) => Err(QuillpadError::Storage(format!("keychain delete failed: {e}"))),
        }
    }
}

/// In-memory credential store, for tests and for embedders that persist
/// session state through their own storage layer.
#[derive(Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        let guard = self
            .record
            .lock()
            .map_err(|_| QuillpadError::Storage("credential store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn store(&self, credentials: &Credentials) -> Result<()> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| QuillpadError::Storage("credential store lock poisoned".into()))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| QuillpadError::Storage("credential store lock poisoned".into()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Tests cover the in-memory store; keychain behaviour depends on the
    //! host OS and is exercised by embedders.
    use super::*;

    fn sample_credentials() -> Credentials {
        Credentials {
            host: "sandbox.quillpad.com".into(),
            user_id: 7,
            auth_token: "S=s1:abc".into(),
            user_store_url: "https://sandbox.quillpad.com/rpc/userstore".into(),
            note_store_url: "https://sandbox.quillpad.com/shard/s1/notestore".into(),
            web_api_url_prefix: "https://sandbox.quillpad.com/shard/s1/".into(),
            expiration: 1_900_000_000_000,
            business_auth_token: None,
            business_note_store_url: None,
        }
    }

    /// Validates the store/load/clear roundtrip scenario.
    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());

        store.store(&sample_credentials()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.auth_token, "S=s1:abc");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    /// Validates that clear on an empty store is a no-op.
    #[test]
    fn clear_is_idempotent() {
        let store = MemoryCredentialStore::new();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    /// A second store call replaces the whole record, not single fields.
    #[test]
    fn store_replaces_whole_record() {
        let store = MemoryCredentialStore::new();
        store.store(&sample_credentials()).unwrap();

        let replacement = Credentials {
            auth_token: "S=s2:def".into(),
            business_auth_token: Some("S=biz:tok".into()),
            ..sample_credentials()
        };
        store.store(&replacement).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.auth_token, "S=s2:def");
        assert_eq!(loaded.business_auth_token.as_deref(), Some("S=biz:tok"));
    }
}
