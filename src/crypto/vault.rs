//! # Password Key Vault
//!
//! Wraps and unwraps secret strings under a password-derived key. Used for
//! at-rest private-key protection (the server-held record) and for the
//! outer layer of backup archives.
//!
//! ## Wrap Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PASSWORD WRAP                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password ──► PBKDF2-HMAC-SHA256(password, salt, iterations)           │
//! │                      │         salt: 128-bit random per wrap           │
//! │                      ▼                                                  │
//! │               256-bit key                                              │
//! │                      │                                                  │
//! │  secret ──────► AES-256-GCM(key, nonce, secret)                        │
//! │                      │         nonce: 96-bit random per wrap           │
//! │                      ▼                                                  │
//! │  WrappedSecret { ciphertext, iv, salt }   (all base64)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unwrap re-derives the key from the stored salt and opens the AEAD.
//! Every unwrap failure is the same [`Error::DecryptionFailure`]: the
//! error must not reveal whether the password, the salt, or the
//! ciphertext was at fault, and the tag comparison itself is
//! constant-time in the underlying AEAD.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::crypto::provider::CryptographyProvider;
use crate::crypto::{NONCE_SIZE, SALT_SIZE};
use crate::error::{Error, Result};

/// A secret string wrapped under a password-derived key
///
/// All fields are base64. `ciphertext` includes the 128-bit
/// authentication tag; `iv` and `salt` are the per-wrap random values
/// needed to re-derive the key and open the blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedSecret {
    /// AES-256-GCM ciphertext with appended tag
    pub ciphertext: String,
    /// 96-bit AEAD nonce
    pub iv: String,
    /// 128-bit PBKDF2 salt
    pub salt: String,
}

/// Wraps and unwraps secret strings under password-derived keys
pub struct PasswordVault {
    provider: Arc<dyn CryptographyProvider>,
    iterations: u32,
}

impl PasswordVault {
    /// Create a vault with the given PBKDF2 iteration count
    ///
    /// The count is a tunable security parameter
    /// ([`DEFAULT_PBKDF2_ITERATIONS`] in production); it only affects new
    /// wraps, since each blob is opened with the key re-derived from its
    /// own salt.
    ///
    /// [`DEFAULT_PBKDF2_ITERATIONS`]: crate::config::DEFAULT_PBKDF2_ITERATIONS
    pub fn new(provider: Arc<dyn CryptographyProvider>, iterations: u32) -> Self {
        Self {
            provider,
            iterations,
        }
    }

    /// Wrap a secret string under a password
    ///
    /// A fresh salt and nonce are drawn per call, so wrapping the same
    /// secret twice produces unrelated blobs.
    pub fn wrap(&self, secret: &str, password: &str) -> Result<WrappedSecret> {
        let mut salt = [0u8; SALT_SIZE];
        self.provider.fill_random(&mut salt);

        let mut nonce = [0u8; NONCE_SIZE];
        self.provider.fill_random(&mut nonce);

        let key = Zeroizing::new(self.provider.derive_password_key(
            password.as_bytes(),
            &salt,
            self.iterations,
        ));

        let ciphertext = self.provider.aead_seal(&key, &nonce, secret.as_bytes())?;

        Ok(WrappedSecret {
            ciphertext: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce),
            salt: BASE64.encode(salt),
        })
    }

    /// Unwrap a secret string with the password it was wrapped under
    ///
    /// Fails with [`Error::DecryptionFailure`] if the password is wrong
    /// or the blob was modified in any way.
    pub fn unwrap(&self, wrapped: &WrappedSecret, password: &str) -> Result<Zeroizing<String>> {
        // Any malformed field is treated as tampering: same uniform error
        // as a tag mismatch.
        let ciphertext = BASE64
            .decode(&wrapped.ciphertext)
            .map_err(|_| Error::DecryptionFailure)?;
        let nonce_bytes = BASE64
            .decode(&wrapped.iv)
            .map_err(|_| Error::DecryptionFailure)?;
        let salt = BASE64
            .decode(&wrapped.salt)
            .map_err(|_| Error::DecryptionFailure)?;

        let nonce: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| Error::DecryptionFailure)?;

        let key = Zeroizing::new(self.provider.derive_password_key(
            password.as_bytes(),
            &salt,
            self.iterations,
        ));

        let plaintext = self.provider.aead_open(&key, &nonce, &ciphertext)?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| Error::DecryptionFailure)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::provider::default_provider;

    // Low iteration count keeps the tests fast; the contract is
    // iteration-count independent.
    const TEST_ITERATIONS: u32 = 1_000;

    fn vault() -> PasswordVault {
        PasswordVault::new(default_provider(), TEST_ITERATIONS)
    }

    #[test]
    fn test_wrap_unwrap_round_trip() {
        let vault = vault();

        let wrapped = vault.wrap("my secret value", "correct horse").unwrap();
        let unwrapped = vault.unwrap(&wrapped, "correct horse").unwrap();

        assert_eq!(&*unwrapped, "my secret value");
    }

    #[test]
    fn test_wrong_password_fails() {
        let vault = vault();

        let wrapped = vault.wrap("my secret value", "correct horse").unwrap();
        let result = vault.unwrap(&wrapped, "battery staple");

        assert!(matches!(result, Err(Error::DecryptionFailure)));
    }

    #[test]
    fn test_empty_secret_and_password_round_trip() {
        // The vault round-trips any strings; empty-password policy
        // belongs to callers.
        let vault = vault();

        let wrapped = vault.wrap("", "").unwrap();
        let unwrapped = vault.unwrap(&wrapped, "").unwrap();

        assert_eq!(&*unwrapped, "");
    }

    #[test]
    fn test_unicode_round_trip() {
        let vault = vault();

        let secret = "pässwörd-gëschützt 秘密 🔐";
        let wrapped = vault.wrap(secret, "clé").unwrap();
        let unwrapped = vault.unwrap(&wrapped, "clé").unwrap();

        assert_eq!(&*unwrapped, secret);
    }

    #[test]
    fn test_same_secret_wraps_differently() {
        let vault = vault();

        let w1 = vault.wrap("secret", "pw").unwrap();
        let w2 = vault.wrap("secret", "pw").unwrap();

        // Fresh salt and nonce per wrap
        assert_ne!(w1.ciphertext, w2.ciphertext);
        assert_ne!(w1.iv, w2.iv);
        assert_ne!(w1.salt, w2.salt);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let vault = vault();

        let mut wrapped = vault.wrap("secret", "pw").unwrap();
        let mut raw = BASE64.decode(&wrapped.ciphertext).unwrap();
        raw[0] ^= 0x01;
        wrapped.ciphertext = BASE64.encode(raw);

        assert!(matches!(
            vault.unwrap(&wrapped, "pw"),
            Err(Error::DecryptionFailure)
        ));
    }

    #[test]
    fn test_corrupted_base64_fails_uniformly() {
        let vault = vault();

        let mut wrapped = vault.wrap("secret", "pw").unwrap();
        wrapped.iv = "!!not base64!!".into();

        assert!(matches!(
            vault.unwrap(&wrapped, "pw"),
            Err(Error::DecryptionFailure)
        ));
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let vault = vault();

        let wrapped = vault.wrap("secret", "pw").unwrap();
        let json = serde_json::to_value(&wrapped).unwrap();

        assert!(json.get("ciphertext").is_some());
        assert!(json.get("iv").is_some());
        assert!(json.get("salt").is_some());
    }
}
