//! In-memory implementation of the [`KeyDirectory`] trait.
//!
//! Models the backend for development and testing: one shared server
//! state, with per-user session handles created through
//! [`MemoryDirectory::session`]. Failure injection lets tests exercise
//! the no-partial-commit paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::{EncryptionMode, KeyDirectory, StoredKeyRecord, TrustedDevice};
use crate::error::{Error, Result};

#[derive(Default)]
struct ServerState {
    /// user id → stored key record (public key is published from here)
    records: HashMap<String, StoredKeyRecord>,
    /// user id → devices
    devices: HashMap<String, Vec<TrustedDevice>>,
    /// conversation id → mode
    modes: HashMap<String, EncryptionMode>,
    /// when set, every call fails with a network error
    failing: bool,
}

/// `KeyDirectory` backed by shared in-memory state
///
/// Each instance is one user's authenticated session against the shared
/// "server"; [`MemoryDirectory::session`] opens another user's session
/// over the same state.
pub struct MemoryDirectory {
    server: Arc<Mutex<ServerState>>,
    user_id: String,
}

impl MemoryDirectory {
    /// Create a fresh server with a session for `user_id`
    pub fn new(user_id: &str) -> Self {
        Self {
            server: Arc::new(Mutex::new(ServerState::default())),
            user_id: user_id.to_string(),
        }
    }

    /// Open another user's session against the same server state
    pub fn session(&self, user_id: &str) -> Self {
        Self {
            server: Arc::clone(&self.server),
            user_id: user_id.to_string(),
        }
    }

    /// Toggle failure injection: while `true`, every directory call
    /// returns a network error
    pub fn set_failing(&self, failing: bool) {
        self.server.lock().failing = failing;
    }

    /// Register a device on a user's account
    pub fn insert_device(&self, user_id: &str, device: TrustedDevice) {
        self.server
            .lock()
            .devices
            .entry(user_id.to_string())
            .or_default()
            .push(device);
    }

    /// Peek at a conversation's mode (test support)
    pub fn encryption_mode(&self, conversation_id: &str) -> Option<EncryptionMode> {
        self.server.lock().modes.get(conversation_id).copied()
    }

    fn guard(&self) -> Result<parking_lot::MutexGuard<'_, ServerState>> {
        let state = self.server.lock();
        if state.failing {
            return Err(Error::NetworkFailure("connection refused".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl KeyDirectory for MemoryDirectory {
    async fn fetch_public_key(&self, user_id: &str) -> Result<Option<String>> {
        let state = self.guard()?;
        Ok(state.records.get(user_id).map(|r| r.public_key.clone()))
    }

    async fn fetch_key_record(&self) -> Result<Option<StoredKeyRecord>> {
        let state = self.guard()?;
        Ok(state.records.get(&self.user_id).cloned())
    }

    async fn put_key_record(&self, record: &StoredKeyRecord) -> Result<()> {
        let mut state = self.guard()?;
        state.records.insert(self.user_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_key_record(&self) -> Result<()> {
        let mut state = self.guard()?;
        state.records.remove(&self.user_id);
        Ok(())
    }

    async fn list_trusted_devices(&self) -> Result<Vec<TrustedDevice>> {
        let state = self.guard()?;
        Ok(state.devices.get(&self.user_id).cloned().unwrap_or_default())
    }

    async fn remove_trusted_device(&self, device_id: &str) -> Result<()> {
        let mut state = self.guard()?;
        if let Some(devices) = state.devices.get_mut(&self.user_id) {
            devices.retain(|d| d.device_id != device_id);
        }
        Ok(())
    }

    async fn set_encryption_mode(
        &self,
        conversation_id: &str,
        mode: EncryptionMode,
    ) -> Result<()> {
        let mut state = self.guard()?;
        state.modes.insert(conversation_id.to_string(), mode);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::KeySalt;

    fn record(public_key: &str) -> StoredKeyRecord {
        StoredKeyRecord {
            public_key: public_key.into(),
            encrypted_private_key: "ct".into(),
            key_salt: KeySalt {
                iv: "iv".into(),
                salt: "salt".into(),
            },
            key_created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let directory = MemoryDirectory::new("alice");

        assert!(directory.fetch_key_record().await.unwrap().is_none());

        directory.put_key_record(&record("alice-pk")).await.unwrap();
        let fetched = directory.fetch_key_record().await.unwrap().unwrap();
        assert_eq!(fetched.public_key, "alice-pk");

        directory.delete_key_record().await.unwrap();
        assert!(directory.fetch_key_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_published_key_visible_to_peers() {
        let alice = MemoryDirectory::new("alice");
        let bob = alice.session("bob");

        alice.put_key_record(&record("alice-pk")).await.unwrap();

        let seen = bob.fetch_public_key("alice").await.unwrap();
        assert_eq!(seen.as_deref(), Some("alice-pk"));
        assert!(bob.fetch_public_key("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let directory = MemoryDirectory::new("alice");
        directory.set_failing(true);

        assert!(matches!(
            directory.fetch_key_record().await,
            Err(Error::NetworkFailure(_))
        ));

        directory.set_failing(false);
        assert!(directory.fetch_key_record().await.is_ok());
    }

    #[tokio::test]
    async fn test_device_removal() {
        let directory = MemoryDirectory::new("alice");
        directory.insert_device(
            "alice",
            TrustedDevice {
                device_id: "d1".into(),
                device_name: "laptop".into(),
                created_at: 0,
                last_used: 0,
                is_active: true,
            },
        );

        assert_eq!(directory.list_trusted_devices().await.unwrap().len(), 1);

        directory.remove_trusted_device("d1").await.unwrap();
        assert!(directory.list_trusted_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mode_storage() {
        let directory = MemoryDirectory::new("alice");

        directory
            .set_encryption_mode("conv-1", EncryptionMode::E2ee)
            .await
            .unwrap();

        assert_eq!(
            directory.encryption_mode("conv-1"),
            Some(EncryptionMode::E2ee)
        );
    }
}
