//! # Device Registry
//!
//! Generates and persists the local device identifier, and manages the
//! server-held list of devices associated with the account.
//!
//! The device id is informational: it identifies this browser profile or
//! installation in the account's device list so the user can audit and
//! revoke sessions. No cryptographic operation is gated on device trust,
//! and removing a device neither revokes nor re-keys anything by itself.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::crypto::CryptographyProvider;
use crate::directory::{KeyDirectory, TrustedDevice};
use crate::error::{Error, Result};

/// Size of the local device identifier in bytes (128 bits)
pub const DEVICE_ID_BYTES: usize = 16;

/// Persistence for the local device identifier
pub trait DeviceIdStore: Send + Sync {
    /// Read the persisted identifier, if one exists
    fn load(&self) -> Result<Option<String>>;

    /// Persist the identifier
    fn save(&self, device_id: &str) -> Result<()>;
}

/// File-backed device-id store
///
/// One small file holding the identifier; survives restarts for the same
/// profile directory.
pub struct FileDeviceStore {
    path: PathBuf,
}

impl FileDeviceStore {
    /// Create a store at the given file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DeviceIdStore for FileDeviceStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let id = contents.trim().to_string();
                Ok(if id.is_empty() { None } else { Some(id) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageError(format!(
                "Failed to read device id: {}",
                e
            ))),
        }
    }

    fn save(&self, device_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, device_id)?;
        Ok(())
    }
}

/// In-memory device-id store for development and tests
#[derive(Default)]
pub struct MemoryDeviceStore {
    id: Mutex<Option<String>>,
}

impl MemoryDeviceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceIdStore for MemoryDeviceStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.id.lock().clone())
    }

    fn save(&self, device_id: &str) -> Result<()> {
        *self.id.lock() = Some(device_id.to_string());
        Ok(())
    }
}

/// Local device identity plus the account's server-held device list
pub struct DeviceRegistry {
    provider: Arc<dyn CryptographyProvider>,
    store: Box<dyn DeviceIdStore>,
    directory: Arc<dyn KeyDirectory>,
}

impl DeviceRegistry {
    /// Create a registry over a store and directory client
    pub fn new(
        provider: Arc<dyn CryptographyProvider>,
        store: Box<dyn DeviceIdStore>,
        directory: Arc<dyn KeyDirectory>,
    ) -> Self {
        Self {
            provider,
            store,
            directory,
        }
    }

    /// Read the persisted device id, creating and persisting one on
    /// first use
    ///
    /// The id is 128 random bits rendered as 32 hex chars, generated
    /// once per profile and stable across sessions.
    pub fn get_or_create_local_device_id(&self) -> Result<String> {
        if let Some(existing) = self.store.load()? {
            return Ok(existing);
        }

        let mut bytes = [0u8; DEVICE_ID_BYTES];
        self.provider.fill_random(&mut bytes);
        let device_id = hex::encode(bytes);

        self.store.save(&device_id)?;
        tracing::info!("generated local device id");
        Ok(device_id)
    }

    /// Human-readable label for this device
    pub fn local_device_name() -> String {
        let os = match std::env::consts::OS {
            "macos" => "macOS",
            "windows" => "Windows",
            "linux" => "Linux",
            "android" => "Android",
            "ios" => "iOS",
            other => other,
        };
        format!("{} ({})", os, std::env::consts::ARCH)
    }

    /// List the devices associated with the account
    pub async fn list_trusted_devices(&self) -> Result<Vec<TrustedDevice>> {
        self.directory.list_trusted_devices().await
    }

    /// Remove one device from the account's list
    ///
    /// Destructive and server-side only: confirmation belongs to the UI,
    /// and no local state changes here.
    pub async fn remove_device(&self, device_id: &str) -> Result<()> {
        self.directory.remove_trusted_device(device_id).await?;
        tracing::info!(device_id, "trusted device removed");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::default_provider;
    use crate::directory::MemoryDirectory;

    fn registry_with(store: Box<dyn DeviceIdStore>) -> DeviceRegistry {
        DeviceRegistry::new(
            default_provider(),
            store,
            Arc::new(MemoryDirectory::new("alice")),
        )
    }

    #[test]
    fn test_device_id_is_stable() {
        let registry = registry_with(Box::new(MemoryDeviceStore::new()));

        let first = registry.get_or_create_local_device_id().unwrap();
        let second = registry.get_or_create_local_device_id().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_device_id_shape() {
        let registry = registry_with(Box::new(MemoryDeviceStore::new()));
        let id = registry.get_or_create_local_device_id().unwrap();

        assert_eq!(id.len(), DEVICE_ID_BYTES * 2);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device-id");

        let first = registry_with(Box::new(FileDeviceStore::new(path.clone())))
            .get_or_create_local_device_id()
            .unwrap();

        // A fresh registry over the same path sees the same id
        let second = registry_with(Box::new(FileDeviceStore::new(path)))
            .get_or_create_local_device_id()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_device_name_is_nonempty() {
        let name = DeviceRegistry::local_device_name();
        assert!(!name.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_remove_devices() {
        let directory = MemoryDirectory::new("alice");
        directory.insert_device(
            "alice",
            TrustedDevice {
                device_id: "aabbcc".into(),
                device_name: "Linux (x86_64)".into(),
                created_at: 0,
                last_used: 0,
                is_active: true,
            },
        );

        let registry = DeviceRegistry::new(
            default_provider(),
            Box::new(MemoryDeviceStore::new()),
            Arc::new(directory),
        );

        let local_before = registry.get_or_create_local_device_id().unwrap();
        assert_eq!(registry.list_trusted_devices().await.unwrap().len(), 1);

        registry.remove_device("aabbcc").await.unwrap();
        assert!(registry.list_trusted_devices().await.unwrap().is_empty());

        // Removal has no local side effects
        assert_eq!(
            registry.get_or_create_local_device_id().unwrap(),
            local_before
        );
    }
}
