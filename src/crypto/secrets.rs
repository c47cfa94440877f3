//! # Shared Secrets
//!
//! Derives the per-peer symmetric content key from our private key and
//! the peer's published public key, and caches it for the session.
//!
//! ## Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SHARED SECRET DERIVATION                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  our X25519 private key  ×  peer X25519 public key                     │
//! │                          │                                              │
//! │                          ▼                                              │
//! │              raw DH output (32 bytes)                                  │
//! │                          │                                              │
//! │                          ▼                                              │
//! │              HKDF-SHA256 (fixed info, no salt)                         │
//! │                          │                                              │
//! │                          ▼                                              │
//! │              256-bit AES-GCM key                                       │
//! │                                                                         │
//! │  Symmetric: derive(A.priv, B.pub) == derive(B.priv, A.pub)            │
//! │  bit for bit. This equality is the correctness anchor of the whole     │
//! │  scheme; the HKDF step takes no per-caller salt for exactly this       │
//! │  reason.                                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One static derived key per peer pair; there is no ratcheting. Cache
//! entries remember the peer public key they were derived from and are
//! replaced when the peer's published key rotates.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use zeroize::ZeroizeOnDrop;

use crate::crypto::keys::{import_public_key, EncryptionKeyPair};
use crate::crypto::provider::CryptographyProvider;
use crate::crypto::ENCRYPTION_KEY_SIZE;
use crate::error::Result;

/// A symmetric content key derived from an X25519 exchange
///
/// Non-exportable: the raw bytes never leave the crate, and the key is
/// zeroized on drop. Session-scoped: rebuilt lazily after logout or a
/// peer key rotation.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    key: [u8; ENCRYPTION_KEY_SIZE],
}

impl SharedSecret {
    pub(crate) fn from_key(key: [u8; ENCRYPTION_KEY_SIZE]) -> Self {
        Self { key }
    }

    pub(crate) fn key_bytes(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// A cached secret together with the peer key it was derived from
struct CachedSecret {
    peer_public_b64: String,
    secret: Arc<SharedSecret>,
}

/// Per-session cache of derived shared secrets, keyed by peer identity
///
/// Reads and writes for the same peer are serialized by the lock;
/// distinct peers proceed without contention beyond the map access.
pub struct SharedSecretCache {
    provider: Arc<dyn CryptographyProvider>,
    entries: RwLock<HashMap<String, CachedSecret>>,
}

impl SharedSecretCache {
    /// Create an empty cache
    pub fn new(provider: Arc<dyn CryptographyProvider>) -> Self {
        Self {
            provider,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Derive (or fetch from cache) the shared secret for a peer
    ///
    /// A cached entry is reused only while `peer_public_b64` still equals
    /// the key it was derived from; a rotated peer key silently replaces
    /// the stale entry with a fresh derivation.
    pub fn derive(
        &self,
        own: &EncryptionKeyPair,
        peer_id: &str,
        peer_public_b64: &str,
    ) -> Result<Arc<SharedSecret>> {
        {
            let entries = self.entries.read();
            if let Some(cached) = entries.get(peer_id) {
                if cached.peer_public_b64 == peer_public_b64 {
                    tracing::trace!(peer_id, "shared secret cache hit");
                    return Ok(Arc::clone(&cached.secret));
                }
                tracing::debug!(peer_id, "peer public key rotated, re-deriving");
            }
        }

        let secret = Arc::new(derive_shared_secret(&self.provider, own, peer_public_b64)?);

        self.entries.write().insert(
            peer_id.to_string(),
            CachedSecret {
                peer_public_b64: peer_public_b64.to_string(),
                secret: Arc::clone(&secret),
            },
        );

        tracing::debug!(peer_id, "derived shared secret");
        Ok(secret)
    }

    /// Drop the cached secret for one peer
    pub fn invalidate(&self, peer_id: &str) {
        self.entries.write().remove(peer_id);
    }

    /// Drop all cached secrets (logout / session teardown)
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached peer secrets
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// One-shot derivation without caching
pub fn derive_shared_secret(
    provider: &Arc<dyn CryptographyProvider>,
    own: &EncryptionKeyPair,
    peer_public_b64: &str,
) -> Result<SharedSecret> {
    let peer_public = import_public_key(peer_public_b64)?;
    let dh_output = provider.diffie_hellman(own.secret_bytes(), &peer_public);
    let key = provider.expand_shared_key(&dh_output)?;
    Ok(SharedSecret::from_key(key))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::provider::default_provider;

    #[test]
    fn test_derivation_is_symmetric() {
        let provider = default_provider();
        let alice = EncryptionKeyPair::generate(&provider);
        let bob = EncryptionKeyPair::generate(&provider);

        let alice_secret =
            derive_shared_secret(&provider, &alice, &bob.export_public()).unwrap();
        let bob_secret =
            derive_shared_secret(&provider, &bob, &alice.export_public()).unwrap();

        assert_eq!(alice_secret.key_bytes(), bob_secret.key_bytes());
    }

    #[test]
    fn test_different_peers_different_secrets() {
        let provider = default_provider();
        let alice = EncryptionKeyPair::generate(&provider);
        let bob = EncryptionKeyPair::generate(&provider);
        let carol = EncryptionKeyPair::generate(&provider);

        let with_bob =
            derive_shared_secret(&provider, &alice, &bob.export_public()).unwrap();
        let with_carol =
            derive_shared_secret(&provider, &alice, &carol.export_public()).unwrap();

        assert_ne!(with_bob.key_bytes(), with_carol.key_bytes());
    }

    #[test]
    fn test_cache_returns_same_secret() {
        let provider = default_provider();
        let cache = SharedSecretCache::new(Arc::clone(&provider));
        let alice = EncryptionKeyPair::generate(&provider);
        let bob = EncryptionKeyPair::generate(&provider);
        let bob_public = bob.export_public();

        let first = cache.derive(&alice, "bob", &bob_public).unwrap();
        let second = cache.derive(&alice, "bob", &bob_public).unwrap();

        // Cache hit: the very same allocation, not just equal bytes
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_invalidated_on_key_rotation() {
        let provider = default_provider();
        let cache = SharedSecretCache::new(Arc::clone(&provider));
        let alice = EncryptionKeyPair::generate(&provider);
        let bob_old = EncryptionKeyPair::generate(&provider);
        let bob_new = EncryptionKeyPair::generate(&provider);

        let stale = cache.derive(&alice, "bob", &bob_old.export_public()).unwrap();
        let fresh = cache.derive(&alice, "bob", &bob_new.export_public()).unwrap();

        // Rotation must never silently reuse the stale secret
        assert_ne!(stale.key_bytes(), fresh.key_bytes());

        // And the fresh entry replaces the stale one
        let again = cache.derive(&alice, "bob", &bob_new.export_public()).unwrap();
        assert!(Arc::ptr_eq(&fresh, &again));
    }

    #[test]
    fn test_clear_empties_cache() {
        let provider = default_provider();
        let cache = SharedSecretCache::new(Arc::clone(&provider));
        let alice = EncryptionKeyPair::generate(&provider);
        let bob = EncryptionKeyPair::generate(&provider);

        cache.derive(&alice, "bob", &bob.export_public()).unwrap();
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_debug_redacts() {
        let provider = default_provider();
        let alice = EncryptionKeyPair::generate(&provider);
        let bob = EncryptionKeyPair::generate(&provider);

        let secret = derive_shared_secret(&provider, &alice, &bob.export_public()).unwrap();
        assert!(format!("{:?}", secret).contains("REDACTED"));
    }
}
