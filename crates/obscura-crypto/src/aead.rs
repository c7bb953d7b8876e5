//! Authenticated encryption of photo payloads (client-side mode).
//!
//! AES-256-GCM with a fresh random 96-bit nonce per call. The nonce is
//! prepended to the ciphertext so a stored object is one self-contained
//! blob: `nonce || ciphertext || tag`.

use crate::key::{SymmetricKey, KEY_SIZE};
use crate::{CryptoError, Result};
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of a nonce in bytes (96 bits for AES-GCM)
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag appended by AES-GCM
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM engine over a borrowed key.
///
/// Constructed per operation from a [`SymmetricKey`] reference; the key
/// bytes are not retained beyond the engine's lifetime.
pub struct CryptoEngine {
    key: [u8; KEY_SIZE],
}

impl CryptoEngine {
    /// Create an engine for the given key
    pub fn new(key: &SymmetricKey) -> Self {
        Self { key: *key.as_bytes() }
    }

    /// Encrypt a payload under a fresh random nonce.
    ///
    /// Returns `nonce || ciphertext || tag` as a single blob. Nonce reuse
    /// under one key breaks GCM, so the nonce always comes from the OS
    /// secure random source; if that source fails the call aborts with
    /// `CryptoUnavailable` rather than falling back.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CryptoError::CryptoUnavailable(format!("os random source failed: {}", e)))?;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a `nonce || ciphertext || tag` blob.
    ///
    /// Fails with `DecryptionFailed` when the blob is too short to carry a
    /// nonce and any ciphertext, or when authentication fails (tampered
    /// data or wrong key). Tampering never yields plaintext.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() <= NONCE_SIZE {
            return Err(CryptoError::DecryptionFailed(format!(
                "blob of {} bytes is too short to carry a nonce and ciphertext",
                blob.len()
            )));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        cipher
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
    }
}
