//! # Decryption Cache
//!
//! Memoizes successfully decrypted plaintext by message identity so
//! re-rendering a conversation never repeats key fetches or shared-secret
//! derivation.
//!
//! ## Semantics
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     DECRYPTION CACHE                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  get_or_decrypt(message_id, decrypt_fn)                                │
//! │      │                                                                  │
//! │      ├── cached plaintext         → returned immediately                │
//! │      │                                                                  │
//! │      ├── another caller in flight → await its result (single-flight)    │
//! │      │                                                                  │
//! │      └── miss                     → run decrypt_fn once                 │
//! │            ├── Ok(plaintext)      → cache + return                      │
//! │            └── Err(_)             → placeholder string, nothing cached  │
//! │                                     (transient failures retry later)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed resolution never aborts rendering of the rest of the
//! conversation; it surfaces as the placeholder for that one message.
//! Entries are session-scoped; `clear()` runs on logout or view teardown.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::Result;

/// Placeholder rendered in place of a message that could not be decrypted
pub const DECRYPTION_PLACEHOLDER: &str = "[Unable to decrypt message]";

/// Session-scoped cache of decrypted message plaintext
#[derive(Default)]
pub struct DecryptionCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl DecryptionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached plaintext for a message, or run the decryption
    /// chain and cache its result
    ///
    /// Concurrent callers for the same message id share one in-flight
    /// decryption; distinct ids proceed independently. On failure the
    /// placeholder is returned and nothing is cached, so a later call
    /// retries the full chain.
    pub async fn get_or_decrypt<F, Fut>(&self, message_id: &str, decrypt: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let slot = {
            let mut entries = self.entries.lock();
            Arc::clone(
                entries
                    .entry(message_id.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        match slot.get_or_try_init(decrypt).await {
            Ok(plaintext) => plaintext.clone(),
            Err(error) => {
                tracing::debug!(message_id, %error, "message decryption failed");
                DECRYPTION_PLACEHOLDER.to_string()
            }
        }
    }

    /// Peek at a cached plaintext without triggering decryption
    pub fn get(&self, message_id: &str) -> Option<String> {
        let entries = self.entries.lock();
        entries
            .get(message_id)
            .and_then(|slot| slot.get())
            .cloned()
    }

    /// Drop one cached entry
    pub fn remove(&self, message_id: &str) {
        self.entries.lock().remove(message_id);
    }

    /// Drop everything (logout / view teardown)
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of messages with cached plaintext
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries.values().filter(|slot| slot.get().is_some()).count()
    }

    /// Whether no plaintext is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_caches_successful_decrypt() {
        let cache = DecryptionCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_decrypt("msg-1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("hello".to_string())
                })
                .await;
            assert_eq!(result, "hello");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("msg-1").as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_failure_returns_placeholder_and_is_not_cached() {
        let cache = DecryptionCache::new();

        let result = cache
            .get_or_decrypt("msg-1", || async { Err(Error::DecryptionFailure) })
            .await;
        assert_eq!(result, DECRYPTION_PLACEHOLDER);
        assert!(cache.get("msg-1").is_none());

        // A transient failure must be retryable: the next call runs the
        // chain again and can succeed.
        let result = cache
            .get_or_decrypt("msg-1", || async { Ok("recovered".to_string()) })
            .await;
        assert_eq!(result, "recovered");
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_single_flight() {
        let cache = Arc::new(DecryptionCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_decrypt("msg-1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("plaintext".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "plaintext");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_messages_are_independent() {
        let cache = DecryptionCache::new();

        let a = cache
            .get_or_decrypt("msg-a", || async { Ok("alpha".to_string()) })
            .await;
        let b = cache
            .get_or_decrypt("msg-b", || async { Ok("beta".to_string()) })
            .await;

        assert_eq!(a, "alpha");
        assert_eq!(b, "beta");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_swapped_sender_key_yields_placeholder() {
        // Alice encrypts to Bob. Before Bob decrypts, Alice's published
        // key is swapped for Carol's. The decryption chain derives the
        // wrong secret and the message renders as the placeholder: never
        // Carol's or Alice's plaintext, never a crash.
        use crate::crypto::{
            default_provider, derive_shared_secret, EncryptionKeyPair, MessageCipher,
        };
        use crate::directory::{require_peer_key, KeyDirectory, KeySalt, MemoryDirectory,
            StoredKeyRecord};

        let provider = default_provider();
        let cipher = MessageCipher::new(Arc::clone(&provider));

        let alice = EncryptionKeyPair::generate(&provider);
        let bob = EncryptionKeyPair::generate(&provider);
        let carol = EncryptionKeyPair::generate(&provider);

        let secret = derive_shared_secret(&provider, &alice, &bob.export_public()).unwrap();
        let payload = cipher.encrypt("for bob only", &secret).unwrap();

        let record = |public_key: String| StoredKeyRecord {
            public_key,
            encrypted_private_key: "ct".into(),
            key_salt: KeySalt {
                iv: "iv".into(),
                salt: "salt".into(),
            },
            key_created_at: 0,
        };

        let server = MemoryDirectory::new("alice");
        server
            .put_key_record(&record(carol.export_public())) // the swap
            .await
            .unwrap();

        let cache = DecryptionCache::new();
        let bob_view = server.session("bob");
        let result = cache
            .get_or_decrypt("msg-1", || async {
                let sender_key = require_peer_key(&bob_view, "alice").await?;
                let wrong = derive_shared_secret(&provider, &bob, &sender_key)?;
                cipher.decrypt(&payload, &wrong)
            })
            .await;

        assert_eq!(result, DECRYPTION_PLACEHOLDER);
        assert!(cache.get("msg-1").is_none());
    }

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let cache = DecryptionCache::new();
        cache
            .get_or_decrypt("msg-1", || async { Ok("hello".to_string()) })
            .await;

        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("msg-1").is_none());
    }
}
