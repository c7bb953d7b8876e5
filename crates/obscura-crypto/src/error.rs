//! Error types for the obscura-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during key management and encryption
#[derive(Error, Debug)]
pub enum CryptoError {
    /// No key has been generated, loaded, or imported yet
    #[error("no encryption key is available; generate or import one first")]
    KeyMissing,

    /// Persisted or imported key material is not the canonical encoding of
    /// exactly 32 bytes
    #[error("invalid key material: {0}")]
    KeyFormatInvalid(String),

    /// The OS secure random source refused to produce bytes
    #[error("secure crypto primitives are unavailable: {0}")]
    CryptoUnavailable(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authentication failed or the blob is malformed
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// IO error while reading or writing the key file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
