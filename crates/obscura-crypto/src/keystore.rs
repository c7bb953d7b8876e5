//! On-disk key lifecycle: generate, load, import, export.
//!
//! One key per store, persisted under a fixed file name in its canonical
//! base64 encoding. The store is the ordering gate for the rest of the
//! system: no encryption or customer-key request happens until `load`,
//! `generate`, or `import` has produced a validated key.

use crate::key::{SymmetricKey, KEY_SIZE};
use crate::{CryptoError, Result};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed name of the persisted key file
const KEY_FILE: &str = "encryption.key";

/// File-backed store for the deployment's single symmetric key.
pub struct KeyStore {
    path: PathBuf,
    current: RwLock<Option<SymmetricKey>>,
}

impl KeyStore {
    /// Create a store rooted at the given directory. No key is available
    /// until `load`, `generate`, or `import` succeeds.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(KEY_FILE),
            current: RwLock::new(None),
        }
    }

    /// Path of the persisted key file
    pub fn key_path(&self) -> &Path {
        &self.path
    }

    /// Generate a fresh random key, persist its canonical encoding, and
    /// make it current. Overwrites any previously persisted key.
    pub fn generate(&self) -> Result<SymmetricKey> {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::CryptoUnavailable(format!("os random source failed: {}", e)))?;
        let key = SymmetricKey::from_bytes(&bytes)?;
        self.persist(&key)?;
        *self.current.write() = Some(key.clone());
        debug!(path = %self.path.display(), "generated new symmetric key");
        Ok(key)
    }

    /// Load the persisted key.
    ///
    /// `KeyMissing` when no key file exists; `KeyFormatInvalid` when the
    /// stored value does not decode to exactly 32 bytes under the canonical
    /// encoding.
    pub fn load(&self) -> Result<SymmetricKey> {
        let encoded = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CryptoError::KeyMissing)
            }
            Err(e) => return Err(CryptoError::Io(e)),
        };
        let key = SymmetricKey::from_base64(&encoded)?;
        *self.current.write() = Some(key.clone());
        Ok(key)
    }

    /// Import a key from its canonical encoding.
    ///
    /// The value is validated in full before anything is written, so a
    /// failed import leaves a previously valid key untouched on disk and in
    /// memory.
    pub fn import(&self, encoded: &str) -> Result<SymmetricKey> {
        let key = SymmetricKey::from_base64(encoded)?;
        self.persist(&key)?;
        *self.current.write() = Some(key.clone());
        debug!("imported symmetric key");
        Ok(key)
    }

    /// Canonical encoding of the current key, for user backup. Exact
    /// inverse of `import`.
    pub fn export(&self) -> Result<String> {
        Ok(self.current()?.to_base64())
    }

    /// The current in-memory key, or `KeyMissing` when none has been
    /// loaded, generated, or imported in this process.
    pub fn current(&self) -> Result<SymmetricKey> {
        self.current.read().clone().ok_or(CryptoError::KeyMissing)
    }

    /// Whether a validated key is available
    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// Base64 MD5 digest over the current key's raw bytes, the verbatim
    /// protocol field for customer-key requests.
    pub fn digest(&self) -> Result<String> {
        Ok(self.current()?.md5_digest_base64())
    }

    fn persist(&self, key: &SymmetricKey) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, key.to_base64())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        let key = store.generate().unwrap();

        let reopened = KeyStore::open(dir.path());
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_load_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        assert!(matches!(store.load(), Err(CryptoError::KeyMissing)));
        assert!(!store.is_ready());
    }

    #[test]
    fn test_load_corrupt_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        fs::write(store.key_path(), "not a key").unwrap();
        assert!(matches!(store.load(), Err(CryptoError::KeyFormatInvalid(_))));
    }

    #[test]
    fn test_import_export_inverse() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        let key = store.generate().unwrap();
        let backup = store.export().unwrap();

        let other_dir = tempfile::tempdir().unwrap();
        let other = KeyStore::open(other_dir.path());
        let imported = other.import(&backup).unwrap();
        assert_eq!(imported.as_bytes(), key.as_bytes());
        assert_eq!(other.export().unwrap(), backup);
    }

    #[test]
    fn test_failed_import_keeps_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        let key = store.generate().unwrap();

        assert!(store.import("@@@ not base64 @@@").is_err());
        assert_eq!(store.current().unwrap().as_bytes(), key.as_bytes());

        let reopened = KeyStore::open(dir.path());
        assert_eq!(reopened.load().unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_generate_overwrites_previous_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        let first = store.generate().unwrap();
        let second = store.generate().unwrap();
        assert_ne!(first.as_bytes(), second.as_bytes());

        let reopened = KeyStore::open(dir.path());
        assert_eq!(reopened.load().unwrap().as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_current_and_digest_require_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path());
        assert!(matches!(store.current(), Err(CryptoError::KeyMissing)));
        assert!(matches!(store.digest(), Err(CryptoError::KeyMissing)));

        let key = store.generate().unwrap();
        assert_eq!(store.digest().unwrap(), key.md5_digest_base64());
    }
}
