//! # Cryptography Provider
//!
//! Injectable interface over the primitive operations the core depends on.
//!
//! Every component above this layer (key pairs, password vault, shared
//! secrets, message cipher) consumes [`CryptographyProvider`] through an
//! `Arc<dyn CryptographyProvider>`, never the primitive crates directly.
//! Substituting a hardware-backed or alternate provider therefore touches
//! no call sites.
//!
//! ## Primitive Map
//!
//! | Operation | Default implementation |
//! |-----------|------------------------|
//! | Random bytes | `rand::rngs::OsRng` |
//! | Key pairs / ECDH | X25519 (`x25519-dalek`) |
//! | Shared-key expansion | HKDF-SHA256 |
//! | Password key derivation | PBKDF2-HMAC-SHA256 |
//! | Authenticated encryption | AES-256-GCM |

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::crypto::{ENCRYPTION_KEY_SIZE, NONCE_SIZE};
use crate::error::{Error, Result};

/// Domain separation string for expanding a raw DH output into an AEAD key.
///
/// Both sides of an exchange must use the same info string; changing it is
/// a protocol break for every peer pair.
const SHARED_KEY_INFO: &[u8] = b"parlor-shared-secret-v1";

/// Primitive cryptographic operations used by the E2EE core
///
/// Implementations must be thread-safe; the default software provider is a
/// stateless unit struct.
pub trait CryptographyProvider: Send + Sync {
    /// Fill `buf` with cryptographically secure random bytes
    fn fill_random(&self, buf: &mut [u8]);

    /// Generate a fresh private scalar for the key-exchange curve
    fn generate_secret_key(&self) -> [u8; 32];

    /// Compute the public key corresponding to a private scalar
    fn public_from_secret(&self, secret: &[u8; 32]) -> [u8; 32];

    /// Run the Diffie-Hellman exchange between our secret and a peer public
    /// key, returning the raw shared bit-string
    ///
    /// Symmetric by construction: `dh(a, B) == dh(b, A)` for key pairs
    /// (a, A) and (b, B).
    fn diffie_hellman(&self, secret: &[u8; 32], peer_public: &[u8; 32]) -> [u8; 32];

    /// Expand a raw DH output into a 256-bit authenticated-encryption key
    fn expand_shared_key(&self, dh_output: &[u8; 32]) -> Result<[u8; ENCRYPTION_KEY_SIZE]>;

    /// Derive a 256-bit key from a password and salt
    fn derive_password_key(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> [u8; ENCRYPTION_KEY_SIZE];

    /// Authenticated-encrypt `plaintext`, returning ciphertext with the
    /// appended authentication tag
    fn aead_seal(
        &self,
        key: &[u8; ENCRYPTION_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Authenticated-decrypt `ciphertext`
    ///
    /// Fails with a uniform [`Error::DecryptionFailure`] on any tag
    /// mismatch; the tag comparison in the underlying AEAD is
    /// constant-time.
    fn aead_open(
        &self,
        key: &[u8; ENCRYPTION_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Default software provider backed by dalek and the RustCrypto crates
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareProvider;

impl CryptographyProvider for SoftwareProvider {
    fn fill_random(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    fn generate_secret_key(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    fn public_from_secret(&self, secret: &[u8; 32]) -> [u8; 32] {
        let secret = StaticSecret::from(*secret);
        X25519PublicKey::from(&secret).to_bytes()
    }

    fn diffie_hellman(&self, secret: &[u8; 32], peer_public: &[u8; 32]) -> [u8; 32] {
        let secret = StaticSecret::from(*secret);
        let peer_public = X25519PublicKey::from(*peer_public);
        secret.diffie_hellman(&peer_public).to_bytes()
    }

    fn expand_shared_key(&self, dh_output: &[u8; 32]) -> Result<[u8; ENCRYPTION_KEY_SIZE]> {
        let hkdf = Hkdf::<Sha256>::new(None, dh_output);
        let mut key = [0u8; ENCRYPTION_KEY_SIZE];
        hkdf.expand(SHARED_KEY_INFO, &mut key)
            .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;
        Ok(key)
    }

    fn derive_password_key(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> [u8; ENCRYPTION_KEY_SIZE] {
        let mut key = [0u8; ENCRYPTION_KEY_SIZE];
        pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
        key
    }

    fn aead_seal(
        &self,
        key: &[u8; ENCRYPTION_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

        cipher
            .encrypt(AesNonce::from_slice(nonce), plaintext)
            .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))
    }

    fn aead_open(
        &self,
        key: &[u8; ENCRYPTION_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::DecryptionFailure)?;

        cipher
            .decrypt(AesNonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionFailure)
    }
}

/// The default provider as a shareable trait object
pub fn default_provider() -> Arc<dyn CryptographyProvider> {
    Arc::new(SoftwareProvider)
}

// ============================================================================
// TESTS
// ============================================================================
