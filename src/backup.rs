//! # Key Backup
//!
//! Exports the user's wrapped private-key record into a password-protected
//! archive, and recovers it on another session.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BACKUP LAYERS                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  StoredKeyRecord.encryptedPrivateKey                                   │
//! │  (already wrapped under the ACCOUNT password)                          │
//! │                 │                                                       │
//! │                 ▼  PasswordVault.wrap(backup password)                  │
//! │  outer ciphertext ── the backup password never touches raw key bytes   │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  BackupBundle { version, created, fingerprint,                         │
//! │                 encryption: outer {algorithm, iv, salt},               │
//! │                 data: inner {publicKey, encryptedPrivateKey,           │
//! │                              keySalt} }                                 │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  archive: magic + version + deflate( bundle.json, README.txt )         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Restore peels the outer layer with the backup password, yielding the
//! inner record. The [`KeyStore`](crate::keystore::KeyStore)'s `Restore`
//! pending action then unwraps the inner layer with the account password
//! supplied at confirmation and re-wraps fresh, so the original key
//! material survives end to end while raw key bytes appear only inside
//! that confirmed step.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::crypto::{
    key_fingerprint, CryptographyProvider, PasswordVault, WrappedSecret, ENCRYPTION_ALGORITHM,
};
use crate::directory::{KeyDirectory, KeySalt};
use crate::error::{Error, Result};

/// Current backup bundle version
pub const BACKUP_VERSION: u32 = 1;

/// Archive magic bytes
const ARCHIVE_MAGIC: [u8; 4] = *b"PLBK";

/// Archive container format version
const ARCHIVE_FORMAT_VERSION: u8 = 1;

/// Name of the structured-data entry inside the archive
const BUNDLE_ENTRY_NAME: &str = "parlor-key-backup.json";

/// Name of the explanatory note entry
const NOTE_ENTRY_NAME: &str = "README.txt";

const NOTE_TEXT: &str = "\
Parlor encryption key backup

This file contains your Parlor private encryption key, protected by two
layers of encryption. Restoring it requires the backup password you chose
when creating this file AND your account password.

Keep this file and both passwords somewhere safe. Nobody, including the
Parlor team, can recover them for you. Without them, messages encrypted
with this key cannot be read.
";

/// The structured document stored inside a backup archive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    /// Bundle format version
    pub version: u32,
    /// Unix millis when the backup was created
    pub created: i64,
    /// Fingerprint of the backed-up public key, for human verification
    pub fingerprint: String,
    /// Outer-layer wrap parameters (backup password)
    pub encryption: BackupEncryption,
    /// The protected key material
    pub data: BackupData,
}

/// Outer-layer cipher parameters of a backup bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEncryption {
    /// Algorithm tag (`"AES-GCM"`)
    pub algorithm: String,
    /// Base64 96-bit nonce of the outer wrap
    pub iv: String,
    /// Base64 128-bit salt of the outer wrap
    pub salt: String,
}

/// Key material carried by a backup bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    /// Base64 public key (plaintext; it is public)
    pub public_key: String,
    /// The server-side wrapped private key, wrapped again under the
    /// backup password
    pub encrypted_private_key: String,
    /// Wrap parameters of the inner (account-password) layer, carried so
    /// a restored record is decryptable without the original server state
    pub key_salt: KeySalt,
}

/// Inner key record recovered from a backup archive
///
/// Still wrapped under the original account password; the key-store's
/// restore confirmation turns it back into a live record.
#[derive(Debug, Clone)]
pub struct RecoveredKey {
    /// Base64 public key
    pub public_key: String,
    /// Private key ciphertext, wrapped under the original account password
    pub encrypted_private_key: String,
    /// Wrap parameters of that inner layer
    pub key_salt: KeySalt,
}

impl RecoveredKey {
    /// View the inner layer as a vault blob
    pub fn wrapped_private_key(&self) -> WrappedSecret {
        WrappedSecret {
            ciphertext: self.encrypted_private_key.clone(),
            iv: self.key_salt.iv.clone(),
            salt: self.key_salt.salt.clone(),
        }
    }
}

/// Creates and restores password-protected key backups
pub struct BackupManager {
    vault: PasswordVault,
    directory: Arc<dyn KeyDirectory>,
}

impl BackupManager {
    /// Create a backup manager over a directory client
    pub fn new(
        provider: Arc<dyn CryptographyProvider>,
        directory: Arc<dyn KeyDirectory>,
        pbkdf2_iterations: u32,
    ) -> Self {
        Self {
            vault: PasswordVault::new(provider, pbkdf2_iterations),
            directory,
        }
    }

    /// Export the current key record as a password-protected archive
    ///
    /// The password pair is validated before any cryptographic or network
    /// work. The value wrapped under the backup password is the stored
    /// `encryptedPrivateKey` ciphertext, never raw key bytes.
    pub async fn create_backup(&self, backup_password: &str, confirm: &str) -> Result<Vec<u8>> {
        if backup_password.is_empty() {
            return Err(Error::PasswordRequired);
        }
        if backup_password != confirm {
            return Err(Error::PasswordMismatch);
        }

        let record = self
            .directory
            .fetch_key_record()
            .await?
            .ok_or(Error::KeyRecordMissing)?;

        let outer = self.vault.wrap(&record.encrypted_private_key, backup_password)?;

        let bundle = BackupBundle {
            version: BACKUP_VERSION,
            created: crate::time::now_timestamp_millis(),
            fingerprint: key_fingerprint(&record.public_key)?,
            encryption: BackupEncryption {
                algorithm: ENCRYPTION_ALGORITHM.to_string(),
                iv: outer.iv,
                salt: outer.salt,
            },
            data: BackupData {
                public_key: record.public_key,
                encrypted_private_key: outer.ciphertext,
                key_salt: record.key_salt,
            },
        };

        let document = serde_json::to_vec_pretty(&bundle)?;
        let archive = write_archive(&[
            (BUNDLE_ENTRY_NAME, &document),
            (NOTE_ENTRY_NAME, NOTE_TEXT.as_bytes()),
        ]);

        tracing::info!("key backup archive created");
        Ok(archive)
    }

    /// Recover the inner key record from a backup archive
    ///
    /// Peels only the outer (backup password) layer; the result still
    /// needs the account password at restore confirmation. A wrong backup
    /// password is a uniform [`Error::DecryptionFailure`].
    pub fn restore_from_backup(
        &self,
        archive: &[u8],
        backup_password: &str,
    ) -> Result<RecoveredKey> {
        if backup_password.is_empty() {
            return Err(Error::PasswordRequired);
        }

        let entries = read_archive(archive)?;
        let document = entries
            .iter()
            .find(|(name, _)| name == BUNDLE_ENTRY_NAME)
            .map(|(_, data)| data)
            .ok_or_else(|| Error::InvalidBackup("Missing backup document".into()))?;

        let bundle: BackupBundle = serde_json::from_slice(document)
            .map_err(|e| Error::InvalidBackup(format!("Malformed backup document: {}", e)))?;

        if bundle.version != BACKUP_VERSION {
            return Err(Error::InvalidBackup(format!(
                "Unsupported backup version {}",
                bundle.version
            )));
        }
        if bundle.encryption.algorithm != ENCRYPTION_ALGORITHM {
            return Err(Error::InvalidBackup(format!(
                "Unsupported backup algorithm {}",
                bundle.encryption.algorithm
            )));
        }

        let outer = WrappedSecret {
            ciphertext: bundle.data.encrypted_private_key,
            iv: bundle.encryption.iv,
            salt: bundle.encryption.salt,
        };
        let inner_ciphertext = self.vault.unwrap(&outer, backup_password)?;

        tracing::info!("key backup archive restored");
        Ok(RecoveredKey {
            public_key: bundle.data.public_key,
            encrypted_private_key: inner_ciphertext.to_string(),
            key_salt: bundle.data.key_salt,
        })
    }
}

// ============================================================================
// ARCHIVE CONTAINER
// ============================================================================

// Layout: magic (4) | format version (1) | deflate-compressed body.
// Body: entry count (u8), then per entry: name length (u16 LE), name
// bytes, data length (u32 LE), data bytes.

fn write_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(entries.len() as u8);

    for (name, data) in entries {
        let name_bytes = name.as_bytes();
        body.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        body.extend_from_slice(name_bytes);
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
    }

    let compressed = miniz_oxide::deflate::compress_to_vec(&body, 6);

    let mut archive = Vec::with_capacity(5 + compressed.len());
    archive.extend_from_slice(&ARCHIVE_MAGIC);
    archive.push(ARCHIVE_FORMAT_VERSION);
    archive.extend_from_slice(&compressed);
    archive
}

fn read_archive(archive: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    if archive.len() < 5 || archive[..4] != ARCHIVE_MAGIC {
        return Err(Error::InvalidBackup("Not a Parlor backup archive".into()));
    }
    if archive[4] != ARCHIVE_FORMAT_VERSION {
        return Err(Error::InvalidBackup(format!(
            "Unsupported archive format version {}",
            archive[4]
        )));
    }

    let body = miniz_oxide::inflate::decompress_to_vec(&archive[5..])
        .map_err(|_| Error::InvalidBackup("Corrupted archive data".into()))?;

    let truncated = || Error::InvalidBackup("Truncated archive".into());

    let mut entries = Vec::new();
    let mut offset = 0usize;
    let count = *body.first().ok_or_else(truncated)?;
    offset += 1;

    for _ in 0..count {
        let name_len_bytes: [u8; 2] = body
            .get(offset..offset + 2)
            .ok_or_else(truncated)?
            .try_into()
            .unwrap();
        let name_len = u16::from_le_bytes(name_len_bytes) as usize;
        offset += 2;

        let name = String::from_utf8(
            body.get(offset..offset + name_len)
                .ok_or_else(truncated)?
                .to_vec(),
        )
        .map_err(|_| Error::InvalidBackup("Invalid entry name".into()))?;
        offset += name_len;

        let data_len_bytes: [u8; 4] = body
            .get(offset..offset + 4)
            .ok_or_else(truncated)?
            .try_into()
            .unwrap();
        let data_len = u32::from_le_bytes(data_len_bytes) as usize;
        offset += 4;

        let data = body
            .get(offset..offset + data_len)
            .ok_or_else(truncated)?
            .to_vec();
        offset += data_len;

        entries.push((name, data));
    }

    Ok(entries)
}

// ============================================================================
// TESTS
// ============================================================================
