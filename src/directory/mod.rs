//! # User Directory
//!
//! The core's view of the backend: peer public-key lookup, the
//! authenticated user's stored key record, trusted-device management, and
//! the per-conversation encryption-mode signal.
//!
//! ## Endpoints
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DIRECTORY SURFACE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  GET    /users/{id}/public-key            → { publicKey }               │
//! │  GET    /users/encryption-keys            → StoredKeyRecord             │
//! │  PUT    /users/encryption-keys            ← StoredKeyRecord             │
//! │  DELETE /users/encryption-keys                                          │
//! │  GET    /auth/trusted-devices             → [TrustedDevice]             │
//! │  DELETE /auth/trusted-devices/{deviceId}                                │
//! │  PUT    /conversations/{id}/encryption-mode ← { encryptionMode }        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every fetch failure or timeout surfaces as [`Error::NetworkFailure`];
//! record mutations are single requests, so either the whole mutation
//! lands or the prior record remains unchanged.

mod http;
mod memory;

pub use http::HttpKeyDirectory;
pub use memory::MemoryDirectory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::WrappedSecret;
use crate::error::{Error, Result};

/// Per-wrap key-derivation parameters stored alongside the wrapped
/// private key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySalt {
    /// Base64 96-bit AEAD nonce
    pub iv: String,
    /// Base64 128-bit PBKDF2 salt
    pub salt: String,
}

/// The authenticated user's server-held key record
///
/// Invariant: the server never holds plaintext private-key bytes;
/// `encrypted_private_key` is only meaningful together with the password
/// it was wrapped under. Replaced wholesale on regeneration, import, or
/// restore; messages encrypted under a replaced pair become permanently
/// undecryptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeyRecord {
    /// Base64 public key, also published for peer lookup
    pub public_key: String,
    /// Base64 ciphertext of the private key, wrapped under the account
    /// password
    pub encrypted_private_key: String,
    /// Wrap parameters for `encrypted_private_key`
    pub key_salt: KeySalt,
    /// Unix millis when the pair was created
    pub key_created_at: i64,
}

impl StoredKeyRecord {
    /// Assemble a record from a public key and a wrapped private key
    pub fn from_wrapped(public_key: String, wrapped: WrappedSecret, created_at: i64) -> Self {
        Self {
            public_key,
            encrypted_private_key: wrapped.ciphertext,
            key_salt: KeySalt {
                iv: wrapped.iv,
                salt: wrapped.salt,
            },
            key_created_at: created_at,
        }
    }

    /// View the wrapped private key as a vault blob
    pub fn wrapped_private_key(&self) -> WrappedSecret {
        WrappedSecret {
            ciphertext: self.encrypted_private_key.clone(),
            iv: self.key_salt.iv.clone(),
            salt: self.key_salt.salt.clone(),
        }
    }
}

/// A device associated with the user's account
///
/// Audit and visibility only: no cryptographic operation is gated on
/// device trust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedDevice {
    /// 128-bit random identifier, 32 hex chars, generated client-side
    pub device_id: String,
    /// Derived human-readable label
    pub device_name: String,
    /// Unix millis when first seen
    pub created_at: i64,
    /// Unix millis of last activity
    pub last_used: i64,
    /// Whether the device is currently active
    pub is_active: bool,
}

/// Per-conversation encryption mode
///
/// Consumed as an external orchestration signal: it decides whether
/// outgoing text is routed through the message cipher at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMode {
    /// Plaintext conversation
    None,
    /// End-to-end encrypted conversation
    E2ee,
}

impl EncryptionMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::E2ee => "e2ee",
        }
    }
}

/// Backend operations the E2EE core depends on
///
/// Implemented by [`HttpKeyDirectory`] in production and
/// [`MemoryDirectory`] for development and tests.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Fetch a peer's published public key; `None` if the peer has never
    /// published one
    async fn fetch_public_key(&self, user_id: &str) -> Result<Option<String>>;

    /// Fetch the authenticated user's stored key record
    async fn fetch_key_record(&self) -> Result<Option<StoredKeyRecord>>;

    /// Replace the stored key record wholesale
    async fn put_key_record(&self, record: &StoredKeyRecord) -> Result<()>;

    /// Delete the stored key record
    async fn delete_key_record(&self) -> Result<()>;

    /// List the devices associated with the account
    async fn list_trusted_devices(&self) -> Result<Vec<TrustedDevice>>;

    /// Remove one device from the account's list
    async fn remove_trusted_device(&self, device_id: &str) -> Result<()>;

    /// Set a conversation's encryption mode
    async fn set_encryption_mode(&self, conversation_id: &str, mode: EncryptionMode)
        -> Result<()>;
}

/// Fetch a peer's public key, failing if none is published
///
/// Callers must not proceed to encrypt under a missing secret; this maps
/// the absent case onto [`Error::PeerKeyUnavailable`].
pub async fn require_peer_key(directory: &dyn KeyDirectory, user_id: &str) -> Result<String> {
    directory
        .fetch_public_key(user_id)
        .await?
        .ok_or_else(|| Error::PeerKeyUnavailable(user_id.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
