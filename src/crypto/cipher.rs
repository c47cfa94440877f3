//! # Message Cipher
//!
//! AES-256-GCM encryption of short text payloads under a derived
//! [`SharedSecret`]. Every call draws a fresh random 96-bit nonce; a
//! nonce is never reused under the same key.
//!
//! The output is the wire-facing [`EncryptedPayload`]: base64 ciphertext
//! (with the 128-bit authentication tag appended), base64 nonce, and an
//! algorithm tag. Decryption of a tampered payload fails outright;
//! there is no partial or garbage plaintext path.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::crypto::provider::CryptographyProvider;
use crate::crypto::secrets::SharedSecret;
use crate::crypto::NONCE_SIZE;
use crate::error::{Error, Result};

/// Algorithm tag carried inside every encrypted payload
pub const ENCRYPTION_ALGORITHM: &str = "AES-GCM";

/// An encrypted message payload as it travels on the wire
///
/// Attached to exactly one message when that message's `isEncrypted`
/// flag is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Base64 ciphertext with appended authentication tag
    pub ciphertext: String,
    /// Base64 96-bit nonce
    pub iv: String,
    /// Algorithm tag (`"AES-GCM"`)
    pub algorithm: String,
}

/// Encrypts and decrypts message text under derived shared secrets
pub struct MessageCipher {
    provider: Arc<dyn CryptographyProvider>,
}

impl MessageCipher {
    /// Create a cipher over the given provider
    pub fn new(provider: Arc<dyn CryptographyProvider>) -> Self {
        Self { provider }
    }

    /// Encrypt a text payload under a shared secret
    ///
    /// Encrypting identical plaintext twice yields different ciphertext:
    /// the nonce is random per call.
    pub fn encrypt(&self, plaintext: &str, key: &SharedSecret) -> Result<EncryptedPayload> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.provider.fill_random(&mut nonce);

        let ciphertext = self
            .provider
            .aead_seal(key.key_bytes(), &nonce, plaintext.as_bytes())?;

        Ok(EncryptedPayload {
            ciphertext: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce),
            algorithm: ENCRYPTION_ALGORITHM.to_string(),
        })
    }

    /// Decrypt an encrypted payload
    ///
    /// Fails with [`Error::DecryptionFailure`] on an unknown algorithm
    /// tag, a wrong key, or any modification of ciphertext or nonce.
    pub fn decrypt(&self, payload: &EncryptedPayload, key: &SharedSecret) -> Result<String> {
        if payload.algorithm != ENCRYPTION_ALGORITHM {
            return Err(Error::DecryptionFailure);
        }
        self.decrypt_parts(&payload.ciphertext, &payload.iv, key)
    }

    /// Decrypt from raw base64 ciphertext and nonce fields
    ///
    /// Used when the wire message carries `content` and `encryptionData`
    /// separately rather than a full [`EncryptedPayload`].
    pub fn decrypt_parts(
        &self,
        ciphertext_b64: &str,
        iv_b64: &str,
        key: &SharedSecret,
    ) -> Result<String> {
        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|_| Error::DecryptionFailure)?;
        let nonce_bytes = BASE64.decode(iv_b64).map_err(|_| Error::DecryptionFailure)?;

        let nonce: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| Error::DecryptionFailure)?;

        let plaintext = self.provider.aead_open(key.key_bytes(), &nonce, &ciphertext)?;

        String::from_utf8(plaintext).map_err(|_| Error::DecryptionFailure)
    }
}

// ============================================================================
// TESTS
// ============================================================================
