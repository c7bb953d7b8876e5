//! # Obscura Crypto
//!
//! Cryptographic core for the Obscura encrypted photo store.
//!
//! This crate provides:
//! - **Key lifecycle**: generate, persist, import and export a single
//!   256-bit symmetric key with one canonical on-disk encoding
//! - **Authenticated encryption**: AES-256-GCM over photo payloads for the
//!   client-side encryption mode
//!
//! The bucket-facing crate (`obscura-client`) borrows key material from the
//! [`KeyStore`] per operation; nothing here touches the network.

pub mod aead;
pub mod error;
pub mod key;
pub mod keystore;

pub use aead::{CryptoEngine, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, Result};
pub use key::{SymmetricKey, KEY_SIZE};
pub use keystore::KeyStore;
