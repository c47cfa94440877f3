//! # Outbound Sealing
//!
//! Turns outgoing text into the wire shape the backend stores:
//! `{content, isEncrypted, encryptionData}`. The per-conversation
//! [`EncryptionMode`] decides whether the text is routed through the
//! message cipher at all.
//!
//! ## Failure Policy
//!
//! [`seal_outgoing`] returns an explicit `Result`. When the encrypt path
//! fails, the error reaches the caller, who owns the decision between
//! surfacing it, retrying, and downgrading to
//! [`OutgoingMessage::plaintext`]. Sending plaintext because encryption
//! failed is a real confidentiality downgrade; it must be a visible,
//! deliberate step in the calling code, never a hidden default of the
//! cipher layer.

use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptedPayload, MessageCipher, SharedSecret};
use crate::directory::EncryptionMode;
use crate::error::{Error, Result};

/// Cipher parameters carried alongside encrypted message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionData {
    /// Base64 96-bit nonce
    pub iv: String,
    /// Algorithm tag (`"AES-GCM"`)
    pub algorithm: String,
}

impl EncryptionData {
    /// Rebuild a full payload from wire fields for decryption
    pub fn to_payload(&self, content: &str) -> EncryptedPayload {
        EncryptedPayload {
            ciphertext: content.to_string(),
            iv: self.iv.clone(),
            algorithm: self.algorithm.clone(),
        }
    }
}

/// An outgoing message in backend wire shape
///
/// `content` holds ciphertext when `is_encrypted` is true, plaintext
/// otherwise; `encryption_data` is present exactly when `is_encrypted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Message content (plaintext or base64 ciphertext)
    pub content: String,
    /// Whether `content` is ciphertext
    pub is_encrypted: bool,
    /// Cipher parameters, present only for encrypted content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_data: Option<EncryptionData>,
}

impl OutgoingMessage {
    /// Build an unencrypted message
    ///
    /// Used for `"none"`-mode conversations, and as the explicit
    /// downgrade a caller may choose after a sealing failure.
    pub fn plaintext(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_encrypted: false,
            encryption_data: None,
        }
    }

    fn encrypted(payload: EncryptedPayload) -> Self {
        Self {
            content: payload.ciphertext,
            is_encrypted: true,
            encryption_data: Some(EncryptionData {
                iv: payload.iv,
                algorithm: payload.algorithm,
            }),
        }
    }
}

/// Seal outgoing text according to the conversation's encryption mode
///
/// `"none"` passes the text through untouched. `"e2ee"` requires the
/// peer's shared secret; callers that could not resolve one (no
/// published key, fetch failure) must not call this with `None` expecting
/// a silent downgrade; the missing secret is an error.
pub fn seal_outgoing(
    cipher: &MessageCipher,
    mode: EncryptionMode,
    plaintext: &str,
    secret: Option<&SharedSecret>,
) -> Result<OutgoingMessage> {
    match mode {
        EncryptionMode::None => Ok(OutgoingMessage::plaintext(plaintext)),
        EncryptionMode::E2ee => {
            let secret = secret.ok_or_else(|| {
                Error::EncryptionFailed("No shared secret for e2ee conversation".into())
            })?;
            let payload = cipher.encrypt(plaintext, secret)?;
            Ok(OutgoingMessage::encrypted(payload))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
