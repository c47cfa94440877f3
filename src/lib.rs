//! # Parlor E2EE Core
//!
//! The end-to-end-encryption core of the Parlor messaging app: key-pair
//! lifecycle, per-peer shared-secret derivation, message ciphering,
//! password-based protection of key material at rest, and backup/restore
//! of key material.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PARLOR E2EE CORE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │  KeyStore   │  │   Backup    │  │   Devices   │  │   Outbound   │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Generate  │  │ - Archive   │  │ - Local id  │  │ - Mode gate  │   │
//! │  │ - Import    │  │ - Restore   │  │ - List      │  │ - Seal       │   │
//! │  │ - Restore   │  │             │  │ - Revoke    │  │ - Wire shape │   │
//! │  │ - Unlock    │  │             │  │             │  │              │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴───────┬────────┴────────────────┘           │
//! │                                  │                                     │
//! │  ┌─────────────────────┐  ┌──────┴──────────────────────────────────┐  │
//! │  │       Crypto        │  │              Directory                  │  │
//! │  │                     │  │                                         │  │
//! │  │ - X25519 key pairs  │  │ - Peer public-key lookup                │  │
//! │  │ - Password vault    │  │ - StoredKeyRecord CRUD                  │  │
//! │  │ - Shared secrets    │  │ - Trusted devices                       │  │
//! │  │ - AES-GCM cipher    │  │ - Encryption-mode signal                │  │
//! │  │ - Provider trait    │  │   (HTTP + in-memory impls)              │  │
//! │  └─────────────────────┘  └─────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  DecryptionCache: single-flight plaintext memoization           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Message Confidentiality (X25519 + HKDF + AES-256-GCM)                 │
//! │  ──────────────────────────────────────────────────────                 │
//! │  Each peer pair shares one static derived key. Every message is        │
//! │  sealed under a fresh random nonce with a 128-bit auth tag.            │
//! │                                                                         │
//! │  Key Material At Rest (PBKDF2 + AES-256-GCM)                           │
//! │  ────────────────────────────────────────────                           │
//! │  The server stores only the password-wrapped private key. The          │
//! │  account password never leaves the client.                             │
//! │                                                                         │
//! │  Backup (second password layer)                                        │
//! │  ──────────────────────────────                                         │
//! │  Backup archives wrap the already-wrapped record under a separate      │
//! │  backup password; raw key bytes never touch the backup layer.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Core configuration
//! - [`crypto`] - Cryptographic primitives and services
//! - [`directory`] - Backend REST surface (keys, devices, modes)
//! - [`keystore`] - Key lifecycle orchestration
//! - [`cache`] - Decryption cache
//! - [`outbound`] - Mode-aware message sealing
//! - [`devices`] - Device registry
//! - [`backup`] - Key backup and restore

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod backup;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod devices;
pub mod directory;
pub mod error;
pub mod keystore;
pub mod outbound;
/// Time utilities shared across the core.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use backup::{BackupBundle, BackupManager, RecoveredKey};
pub use cache::{DecryptionCache, DECRYPTION_PLACEHOLDER};
pub use config::CoreConfig;
pub use crypto::{
    CryptographyProvider, EncryptedPayload, EncryptionKeyPair, MessageCipher, PasswordVault,
    SharedSecret, SharedSecretCache,
};
pub use directory::{
    EncryptionMode, HttpKeyDirectory, KeyDirectory, MemoryDirectory, StoredKeyRecord,
    TrustedDevice,
};
pub use error::{Error, Result};
pub use keystore::{KeyStore, PendingKeyAction};
pub use outbound::{seal_outgoing, OutgoingMessage};

/// Returns the version of the Parlor E2EE core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
