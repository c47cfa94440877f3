//! # Key Management
//!
//! X25519 key pairs for per-peer shared-secret derivation, plus the
//! base64 import/export surface the rest of the app speaks.
//!
//! ## Import Validation Order
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       KEY IMPORT PIPELINE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  key string                                                            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  1. validate_key_format()          cheap, synchronous, no decode       │
//! │     • base64 alphabet only          → InvalidKeyFormat                  │
//! │     • length inside 40..=60 chars   → InvalidKeyFormat                  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  2. base64 decode                   → InvalidKeyFormat on bad padding   │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  3. exactly 32 key bytes            → CryptoImportFailure otherwise     │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  valid key                                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both failure paths fire before any network call or curve arithmetic.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::ZeroizeOnDrop;

use crate::crypto::provider::CryptographyProvider;
use crate::crypto::PUBLIC_KEY_SIZE;
use crate::error::{Error, Result};

/// Minimum plausible length of a base64-encoded raw 32-byte key
const KEY_B64_MIN_LEN: usize = 40;

/// Maximum plausible length of a base64-encoded raw 32-byte key
const KEY_B64_MAX_LEN: usize = 60;

/// Number of digest bytes rendered into a fingerprint
const FINGERPRINT_BYTES: usize = 8;

/// X25519 key pair used for shared-secret derivation
///
/// The private scalar is zeroized when the pair is dropped. Key material
/// leaves this struct only through the explicit export methods.
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKeyPair {
    /// Private scalar (secret)
    secret: [u8; 32],
    /// Public key (derived from the secret)
    public: [u8; PUBLIC_KEY_SIZE],
}

impl EncryptionKeyPair {
    /// Generate a fresh random key pair
    pub fn generate(provider: &Arc<dyn CryptographyProvider>) -> Self {
        let secret = provider.generate_secret_key();
        let public = provider.public_from_secret(&secret);
        Self { secret, public }
    }

    /// Import a key pair from a base64-encoded private key, recomputing
    /// the public key from the private scalar
    ///
    /// Used when a user supplies only a private key during import or
    /// restore.
    pub fn from_private_base64(
        provider: &Arc<dyn CryptographyProvider>,
        private_b64: &str,
    ) -> Result<Self> {
        let secret = decode_key_bytes(private_b64)?;
        let public = provider.public_from_secret(&secret);
        Ok(Self { secret, public })
    }

    /// Export the public key as base64
    pub fn export_public(&self) -> String {
        BASE64.encode(self.public)
    }

    /// Export the private key as base64
    ///
    /// Only for wrapping into a [`StoredKeyRecord`]. Never log or
    /// transmit the result in the clear.
    ///
    /// [`StoredKeyRecord`]: crate::directory::StoredKeyRecord
    pub fn export_private(&self) -> String {
        BASE64.encode(self.secret)
    }

    /// Raw private scalar (crate-internal)
    pub(crate) fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Raw public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public
    }
}

// Prevent accidental logging of the private scalar
impl std::fmt::Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyPair")
            .field("public", &BASE64.encode(self.public))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Check that a string is plausibly a base64-encoded key, without
/// decoding it
///
/// This is the cheap pre-flight gate: callers run it before the decoding
/// imports so that obviously malformed input fails with
/// [`Error::InvalidKeyFormat`] and never reaches curve arithmetic or the
/// network.
pub fn validate_key_format(key_b64: &str) -> Result<()> {
    let len = key_b64.len();
    if !(KEY_B64_MIN_LEN..=KEY_B64_MAX_LEN).contains(&len) {
        return Err(Error::InvalidKeyFormat(format!(
            "Key length {} outside expected range {}..={}",
            len, KEY_B64_MIN_LEN, KEY_B64_MAX_LEN
        )));
    }

    if !key_b64
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
    {
        return Err(Error::InvalidKeyFormat(
            "Key contains non-base64 characters".into(),
        ));
    }

    Ok(())
}

/// Import and validate a base64-encoded public key
pub fn import_public_key(public_b64: &str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    decode_key_bytes(public_b64)
}

/// Compute the human-verifiable fingerprint of a public key
///
/// The first 8 bytes of SHA-256 over the raw key bytes, rendered as
/// colon-separated hex pairs (`"3f:9a:..."`). Deterministic for a given
/// key; used only for out-of-band comparison, never enforced
/// programmatically.
pub fn key_fingerprint(public_b64: &str) -> Result<String> {
    let key_bytes = import_public_key(public_b64)?;

    let mut hasher = Sha256::new();
    hasher.update(key_bytes);
    let digest = hasher.finalize();

    Ok(digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Decode a validated base64 key string into raw key bytes
fn decode_key_bytes(key_b64: &str) -> Result<[u8; 32]> {
    validate_key_format(key_b64)?;

    let bytes = BASE64
        .decode(key_b64)
        .map_err(|e| Error::InvalidKeyFormat(format!("Invalid base64: {}", e)))?;

    bytes.try_into().map_err(|_| {
        Error::CryptoImportFailure("Decoded key is not 32 bytes".into())
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::provider::default_provider;

    #[test]
    fn test_keypair_generation_distinct() {
        let provider = default_provider();
        let kp1 = EncryptionKeyPair::generate(&provider);
        let kp2 = EncryptionKeyPair::generate(&provider);

        assert_ne!(kp1.public_bytes(), kp2.public_bytes());
    }

    #[test]
    fn test_private_key_round_trip() {
        let provider = default_provider();
        let kp = EncryptionKeyPair::generate(&provider);

        let restored =
            EncryptionKeyPair::from_private_base64(&provider, &kp.export_private()).unwrap();

        // Re-importing the private key must reproduce the same public key
        assert_eq!(kp.public_bytes(), restored.public_bytes());
        assert_eq!(kp.export_public(), restored.export_public());
    }

    #[test]
    fn test_export_is_deterministic() {
        let provider = default_provider();
        let kp = EncryptionKeyPair::generate(&provider);

        assert_eq!(kp.export_public(), kp.export_public());
        assert_eq!(kp.export_private(), kp.export_private());
    }

    #[test]
    fn test_import_public_key_round_trip() {
        let provider = default_provider();
        let kp = EncryptionKeyPair::generate(&provider);

        let bytes = import_public_key(&kp.export_public()).unwrap();
        assert_eq!(bytes, kp.public_bytes());
    }

    #[test]
    fn test_non_base64_fails_with_invalid_format() {
        let result = import_public_key("not valid base64 because of spaces!!!!!!!!!!!");
        assert!(matches!(result, Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_implausible_length_fails_with_invalid_format() {
        // Too short (well-formed base64 of 8 bytes)
        let short = BASE64.encode([0u8; 8]);
        assert!(matches!(
            import_public_key(&short),
            Err(Error::InvalidKeyFormat(_))
        ));

        // Too long
        let long = BASE64.encode([0u8; 64]);
        assert!(matches!(
            import_public_key(&long),
            Err(Error::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_wrong_decoded_length_fails_with_import_failure() {
        // 33 bytes encode to 44 chars: passes the length band, fails the
        // decoded-length check
        let b64 = BASE64.encode([0u8; 33]);
        assert!(matches!(
            import_public_key(&b64),
            Err(Error::CryptoImportFailure(_))
        ));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let provider = default_provider();
        let kp = EncryptionKeyPair::generate(&provider);
        let public = kp.export_public();

        assert_eq!(key_fingerprint(&public).unwrap(), key_fingerprint(&public).unwrap());
    }

    #[test]
    fn test_fingerprint_distinct_keys_differ() {
        let provider = default_provider();
        let kp1 = EncryptionKeyPair::generate(&provider);
        let kp2 = EncryptionKeyPair::generate(&provider);

        assert_ne!(
            key_fingerprint(&kp1.export_public()).unwrap(),
            key_fingerprint(&kp2.export_public()).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_shape() {
        let provider = default_provider();
        let kp = EncryptionKeyPair::generate(&provider);

        let fp = key_fingerprint(&kp.export_public()).unwrap();
        let pairs: Vec<&str> = fp.split(':').collect();

        assert_eq!(pairs.len(), 8);
        assert!(pairs.iter().all(|p| p.len() == 2
            && p.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let provider = default_provider();
        let kp = EncryptionKeyPair::generate(&provider);

        let debug = format!("{:?}", kp);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&kp.export_private()));
    }
}
