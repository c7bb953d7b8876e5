//! Symmetric key material and its derived encodings.
//!
//! The 32 raw bytes are the single authoritative value. Every textual form
//! (standard base64, URL-safe base64, hex, the MD5 digest used by the
//! customer-key protocol) is computed from them on demand and never stored
//! independently.

use crate::{CryptoError, Result};
use base64::Engine;
use md5::{Digest, Md5};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A 256-bit symmetric key.
///
/// Padded standard base64 is the canonical encoding for persistence and for
/// the customer-key request headers. Key bytes are wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Create a key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::KeyFormatInvalid(format!(
                "key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Canonical encoding: padded standard base64
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.key)
    }

    /// Decode from the canonical encoding.
    ///
    /// Anything that is not padded standard base64 of exactly 32 bytes is
    /// `KeyFormatInvalid`. Keys written by other tools in URL-safe base64 or
    /// hex are rejected rather than guessed at; a silent migration between
    /// encodings is how keys get corrupted.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyFormatInvalid(format!("base64 decode failed: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// URL-safe base64 without padding, for embedding in URLs
    pub fn to_base64_url(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.key)
    }

    /// Hex encoding, for display and debugging
    pub fn to_hex(&self) -> String {
        hex::encode(self.key)
    }

    /// Base64 of the MD5 digest over the raw key bytes.
    ///
    /// The customer-key protocol requires this verbatim as a transport
    /// tamper check. The digest covers the 32 raw bytes, not any textual
    /// encoding of them; computing it over the base64 text gets every
    /// request rejected by a validating server.
    pub fn md5_digest_base64(&self) -> String {
        let digest = Md5::digest(self.key);
        base64::engine::general_purpose::STANDARD.encode(digest)
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print key material
        write!(f, "SymmetricKey(..)")
    }
}
