//! # Cryptography Module
//!
//! All cryptographic primitives and key-handling services of the Parlor
//! E2EE core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY LIFECYCLE                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  X25519 key pair (per user)                                     │   │
//! │  │       │                                                         │   │
//! │  │       ├── public key  → published to the user directory         │   │
//! │  │       │                                                         │   │
//! │  │       └── private key → wrapped under the account password      │   │
//! │  │                          (PBKDF2 → AES-256-GCM) and stored      │   │
//! │  │                          server-side as a StoredKeyRecord       │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 MESSAGE ENCRYPTION                              │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Key Exchange: X25519 ECDH                                  │   │
//! │  │     our private × peer public = shared bit-string              │   │
//! │  │                                                                 │   │
//! │  │  2. Key Derivation: HKDF-SHA256                                │   │
//! │  │     shared bit-string → 256-bit content key                    │   │
//! │  │     (one static key per peer pair, no ratcheting)              │   │
//! │  │                                                                 │   │
//! │  │  3. Encryption: AES-256-GCM                                    │   │
//! │  │     • 256-bit key                                              │   │
//! │  │     • 96-bit nonce (random per message)                        │   │
//! │  │     • 128-bit authentication tag                               │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | X25519 | Key Exchange | Fast ECDH, small keys, widely audited |
//! | AES-256-GCM | Encryption | Hardware acceleration, AEAD |
//! | HKDF-SHA256 | Shared-key expansion | Industry standard |
//! | PBKDF2-HMAC-SHA256 | Password KDF | Tunable cost, ubiquitous |
//! | SHA-256 | Fingerprints | Collision resistance |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret keys and shared secrets are zeroized on drop
//! 2. **No Key Reuse**: fresh random nonce for every encryption operation
//! 3. **Uniform Failures**: every decryption failure is indistinguishable
//! 4. **Injectable Provider**: primitives live behind [`CryptographyProvider`]

mod cipher;
mod keys;
pub mod provider;
mod secrets;
mod vault;

pub use cipher::{EncryptedPayload, MessageCipher, ENCRYPTION_ALGORITHM};
pub use keys::{import_public_key, key_fingerprint, validate_key_format, EncryptionKeyPair};
pub use provider::{default_provider, CryptographyProvider, SoftwareProvider};
pub use secrets::{derive_shared_secret, SharedSecret, SharedSecretCache};
pub use vault::{PasswordVault, WrappedSecret};

/// Size of symmetric encryption keys in bytes (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Size of public keys in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the PBKDF2 salt in bytes (128 bits)
pub const SALT_SIZE: usize = 16;
