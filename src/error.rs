//! # Error Handling
//!
//! Error types for the Parlor E2EE core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Validation Errors (surface before crypto or network work)         │
//! │  │   ├── InvalidKeyFormat      - Malformed key string                   │
//! │  │   ├── PasswordMismatch      - Confirmation field differs             │
//! │  │   └── PasswordRequired      - Empty password supplied                │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── CryptoImportFailure   - Bytes are not a valid key              │
//! │  │   ├── KeyDerivationFailed   - KDF step failed                        │
//! │  │   ├── EncryptionFailed      - AEAD seal failed                       │
//! │  │   └── DecryptionFailure     - Auth-tag mismatch (wrong key/password, │
//! │  │                               corruption, or tampering)              │
//! │  │                                                                      │
//! │  ├── Directory Errors                                                  │
//! │  │   ├── PeerKeyUnavailable    - Peer never published a public key      │
//! │  │   ├── NetworkFailure        - Fetch failed or timed out              │
//! │  │   └── KeyRecordMissing      - No stored key record for this user     │
//! │  │                                                                      │
//! │  ├── Backup Errors                                                     │
//! │  │   ├── InvalidBackup         - Archive/bundle malformed or version    │
//! │  │   └── SerializationError    - JSON encode/decode failed              │
//! │  │                                                                      │
//! │  └── Storage Errors                                                    │
//! │      └── StorageError          - Local device-id store failed           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation errors are raised before any network call or expensive key
//! derivation. `DecryptionFailure` is uniform: it never distinguishes a
//! wrong password from a tampered blob.

use thiserror::Error;

/// Result type alias for Parlor E2EE core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Parlor E2EE core
///
/// Errors are categorized by the layer that raises them so callers can
/// decide between surfacing, retrying, and placeholder rendering.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors (100-199)
    // ========================================================================

    /// Key string is syntactically malformed (not base64, or outside the
    /// expected length band). Raised before any decode or import attempt.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// A password confirmation field does not match the chosen password
    #[error("Passwords do not match.")]
    PasswordMismatch,

    /// A required password was empty
    #[error("A password is required for this operation.")]
    PasswordRequired,

    /// Confirmation was requested with no key action pending
    #[error("No key action is awaiting confirmation.")]
    NoPendingAction,

    // ========================================================================
    // Crypto Errors (200-299)
    // ========================================================================

    /// Decoded bytes do not form a valid key on the expected curve
    #[error("Key import failed: {0}")]
    CryptoImportFailure(String),

    /// A key-derivation step failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// AEAD encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// AEAD decryption failed: wrong key, wrong password, or tampering.
    /// Deliberately carries no detail about where the mismatch lies.
    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailure,

    // ========================================================================
    // Directory Errors (300-399)
    // ========================================================================

    /// The peer has never published a public key
    #[error("No public key published for user {0}")]
    PeerKeyUnavailable(String),

    /// A directory fetch failed or timed out
    #[error("Network request failed: {0}")]
    NetworkFailure(String),

    /// The authenticated user has no stored key record
    #[error("No encryption key record exists for this account.")]
    KeyRecordMissing,

    // ========================================================================
    // Backup Errors (400-499)
    // ========================================================================

    /// Backup archive or bundle is malformed or has an unsupported version
    #[error("Invalid backup archive: {0}")]
    InvalidBackup(String),

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ========================================================================
    // Storage Errors (500-599)
    // ========================================================================

    /// Local device-id storage failed
    #[error("Local storage error: {0}")]
    StorageError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Validation
    /// - 200-299: Crypto
    /// - 300-399: Directory
    /// - 400-499: Backup
    /// - 500-599: Storage
    pub fn code(&self) -> i32 {
        match self {
            // Validation (100-199)
            Error::InvalidKeyFormat(_) => 100,
            Error::PasswordMismatch => 101,
            Error::PasswordRequired => 102,
            Error::NoPendingAction => 103,

            // Crypto (200-299)
            Error::CryptoImportFailure(_) => 200,
            Error::KeyDerivationFailed(_) => 201,
            Error::EncryptionFailed(_) => 202,
            Error::DecryptionFailure => 203,

            // Directory (300-399)
            Error::PeerKeyUnavailable(_) => 300,
            Error::NetworkFailure(_) => 301,
            Error::KeyRecordMissing => 302,

            // Backup (400-499)
            Error::InvalidBackup(_) => 400,
            Error::SerializationError(_) => 401,

            // Storage (500-599)
            Error::StorageError(_) => 500,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying or by
    /// user action (a transient fetch failure, a mistyped password).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NetworkFailure(_)
                | Error::PeerKeyUnavailable(_)
                | Error::PasswordMismatch
                | Error::PasswordRequired
                | Error::DecryptionFailure
        )
    }

    /// Check if this error is a pre-flight validation failure
    ///
    /// Validation failures are raised before any network or expensive
    /// crypto work and should be surfaced to the user directly.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidKeyFormat(_) | Error::PasswordMismatch | Error::PasswordRequired
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidKeyFormat("x".into()).code(), 100);
        assert_eq!(Error::CryptoImportFailure("x".into()).code(), 200);
        assert_eq!(Error::PeerKeyUnavailable("u".into()).code(), 300);
        assert_eq!(Error::InvalidBackup("x".into()).code(), 400);
        assert_eq!(Error::StorageError("x".into()).code(), 500);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::NetworkFailure("timeout".into()).is_recoverable());
        assert!(Error::DecryptionFailure.is_recoverable());
        assert!(!Error::CryptoImportFailure("bad".into()).is_recoverable());
    }

    #[test]
    fn test_validation_errors() {
        assert!(Error::InvalidKeyFormat("x".into()).is_validation());
        assert!(Error::PasswordRequired.is_validation());
        assert!(!Error::DecryptionFailure.is_validation());
    }

    #[test]
    fn test_decryption_failure_is_uniform() {
        // The message must not hint at whether the password or the blob
        // was at fault.
        let msg = Error::DecryptionFailure.to_string();
        assert!(!msg.contains("password"));
    }
}
