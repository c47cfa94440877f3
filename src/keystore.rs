//! # Key Store
//!
//! Orchestrates the key-pair lifecycle against the directory: generate,
//! import, restore, unlock, and delete.
//!
//! ## Pending-Action State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   KEY LIFECYCLE CONFIRMATION                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   begin_generate() ──┐                                                  │
//! │   begin_import(key) ─┼──► PendingKeyAction ──► confirm(password)       │
//! │   begin_restore(rec)─┘         │                     │                  │
//! │                                │                     ▼                  │
//! │                        cancel_pending()      wrap private key,          │
//! │                                              build full record,         │
//! │                                              single PUT upload          │
//! │                                                      │                  │
//! │                              ┌───────────────────────┤                  │
//! │                              ▼                       ▼                  │
//! │                      NetworkFailure:           success:                 │
//! │                      nothing committed,        pending cleared,         │
//! │                      pending survives          record returned          │
//! │                      for retry                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every path replaces the stored record wholesale. Messages encrypted
//! under a replaced pair become permanently undecryptable; that loss is
//! inherent to regeneration, not a defect.

use parking_lot::Mutex;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::backup::RecoveredKey;
use crate::crypto::{
    validate_key_format, CryptographyProvider, EncryptionKeyPair, PasswordVault,
};
use crate::directory::{KeyDirectory, StoredKeyRecord};
use crate::error::{Error, Result};

/// A key action staged for password confirmation
///
/// At most one action is pending at a time; a newly begun action
/// replaces the previous one.
pub enum PendingKeyAction {
    /// Generate a fresh key pair
    Generate,
    /// Import a user-supplied private key (base64, format pre-validated)
    Import {
        /// The private key awaiting confirmation
        private_key: String,
    },
    /// Re-activate key material recovered from a backup archive
    Restore {
        /// The inner record recovered by the backup manager
        recovered: RecoveredKey,
    },
}

/// Discriminant of a pending action, for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    /// A generate action is staged
    Generate,
    /// An import action is staged
    Import,
    /// A restore action is staged
    Restore,
}

/// Key-pair lifecycle service
pub struct KeyStore {
    provider: Arc<dyn CryptographyProvider>,
    vault: PasswordVault,
    directory: Arc<dyn KeyDirectory>,
    pending: Mutex<Option<PendingKeyAction>>,
}

impl KeyStore {
    /// Create a key store over a directory client
    pub fn new(
        provider: Arc<dyn CryptographyProvider>,
        directory: Arc<dyn KeyDirectory>,
        pbkdf2_iterations: u32,
    ) -> Self {
        let vault = PasswordVault::new(Arc::clone(&provider), pbkdf2_iterations);
        Self {
            provider,
            vault,
            directory,
            pending: Mutex::new(None),
        }
    }

    /// Stage generation of a fresh key pair
    pub fn begin_generate(&self) {
        *self.pending.lock() = Some(PendingKeyAction::Generate);
    }

    /// Stage import of a user-supplied private key
    ///
    /// The key string is format-validated here, before any confirmation
    /// or network work, so a malformed paste fails immediately.
    pub fn begin_import(&self, private_key_b64: &str) -> Result<()> {
        validate_key_format(private_key_b64)?;
        *self.pending.lock() = Some(PendingKeyAction::Import {
            private_key: private_key_b64.to_string(),
        });
        Ok(())
    }

    /// Stage re-activation of key material recovered from a backup
    pub fn begin_restore(&self, recovered: RecoveredKey) {
        *self.pending.lock() = Some(PendingKeyAction::Restore { recovered });
    }

    /// The kind of action currently awaiting confirmation, if any
    pub fn pending_kind(&self) -> Option<PendingKind> {
        self.pending.lock().as_ref().map(|action| match action {
            PendingKeyAction::Generate => PendingKind::Generate,
            PendingKeyAction::Import { .. } => PendingKind::Import,
            PendingKeyAction::Restore { .. } => PendingKind::Restore,
        })
    }

    /// Discard the staged action
    pub fn cancel_pending(&self) {
        *self.pending.lock() = None;
    }

    /// Execute the staged action under the supplied account password
    ///
    /// Builds the complete [`StoredKeyRecord`] locally and uploads it in
    /// a single request. On [`Error::NetworkFailure`] nothing is
    /// committed and the pending action survives so the user can retry;
    /// on success the action is cleared and the new record returned.
    pub async fn confirm(&self, password: &str) -> Result<StoredKeyRecord> {
        if password.is_empty() {
            return Err(Error::PasswordRequired);
        }

        // Work on the staged action without consuming it: it must remain
        // for retry if the upload fails.
        let keypair = {
            let pending = self.pending.lock();
            match pending.as_ref() {
                None => return Err(Error::NoPendingAction),
                Some(PendingKeyAction::Generate) => EncryptionKeyPair::generate(&self.provider),
                Some(PendingKeyAction::Import { private_key }) => {
                    EncryptionKeyPair::from_private_base64(&self.provider, private_key)?
                }
                Some(PendingKeyAction::Restore { recovered }) => {
                    self.reactivate_recovered(recovered, password)?
                }
            }
        };

        let wrapped = self.vault.wrap(&keypair.export_private(), password)?;
        let record = StoredKeyRecord::from_wrapped(
            keypair.export_public(),
            wrapped,
            crate::time::now_timestamp_millis(),
        );

        self.directory.put_key_record(&record).await?;
        *self.pending.lock() = None;

        tracing::info!("key record replaced");
        Ok(record)
    }

    /// Unwrap a recovered inner record back into a key pair
    ///
    /// The supplied password must be the account password the record was
    /// originally wrapped under; a wrong password is a uniform
    /// [`Error::DecryptionFailure`].
    fn reactivate_recovered(
        &self,
        recovered: &RecoveredKey,
        password: &str,
    ) -> Result<EncryptionKeyPair> {
        let private_b64 = self
            .vault
            .unwrap(&recovered.wrapped_private_key(), password)?;

        let keypair = EncryptionKeyPair::from_private_base64(&self.provider, &private_b64)?;

        // The bundle's public key must match the one recomputed from the
        // private scalar, or the archive is internally inconsistent.
        if keypair.export_public() != recovered.public_key {
            return Err(Error::InvalidBackup(
                "Recovered public key does not match private key".into(),
            ));
        }

        Ok(keypair)
    }

    /// Fetch and unlock the stored private key for this session
    pub async fn unlock(&self, password: &str) -> Result<EncryptionKeyPair> {
        if password.is_empty() {
            return Err(Error::PasswordRequired);
        }

        let record = self
            .directory
            .fetch_key_record()
            .await?
            .ok_or(Error::KeyRecordMissing)?;

        let private_b64: Zeroizing<String> =
            self.vault.unwrap(&record.wrapped_private_key(), password)?;

        EncryptionKeyPair::from_private_base64(&self.provider, &private_b64)
    }

    /// Delete the stored key record
    ///
    /// Destructive: the wrapped private key is gone from the server and
    /// any messages encrypted under it become undecryptable once local
    /// session state is dropped.
    pub async fn delete_keys(&self) -> Result<()> {
        self.directory.delete_key_record().await?;
        tracing::info!("key record deleted");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
