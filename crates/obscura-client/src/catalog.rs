//! Local photo catalog: listing, resolution to decrypted content, and
//! handle lifecycle.
//!
//! The catalog owns every in-memory content handle. A handle is created on
//! first successful resolution, replaced on retry, and revoked on removal
//! or teardown; at most one live handle exists per object key.

use crate::types::{object_key_for, StoredObject};
use crate::{ClientError, EncryptionMode, ObjectStoreClient, Result};
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use obscura_crypto::{CryptoEngine, KeyStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Content type assumed when the bucket reports none
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// A revocable reference to decrypted photo content held in memory.
///
/// The UI resolves a handle each time it needs the bytes; once revoked,
/// resolution returns `None` forever.
#[derive(Debug)]
pub struct ContentHandle {
    content: Mutex<Option<Bytes>>,
    content_type: String,
}

impl ContentHandle {
    fn new(content: Bytes, content_type: String) -> Arc<Self> {
        Arc::new(Self {
            content: Mutex::new(Some(content)),
            content_type,
        })
    }

    /// The decrypted bytes, or `None` after revocation
    pub fn resolve(&self) -> Option<Bytes> {
        self.content.lock().clone()
    }

    /// Drop the content. Idempotent.
    pub fn revoke(&self) {
        self.content.lock().take();
    }

    /// Whether the handle has been revoked
    pub fn is_revoked(&self) -> bool {
        self.content.lock().is_none()
    }

    /// Content type of the decrypted bytes
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Outcome of resolving one object
#[derive(Clone, Debug)]
pub enum ResolutionStatus {
    /// Content was fetched (and decrypted, in client-side mode)
    Resolved,
    /// Fetch or decryption failed; the reason is kept for display and the
    /// object stays retryable
    Failed(String),
}

/// A listed object together with its local resolution state
#[derive(Clone, Debug)]
pub struct ResolvedPhoto {
    /// The remote record
    pub object: StoredObject,
    /// Live content handle; absent when resolution failed
    pub handle: Option<Arc<ContentHandle>>,
    /// Resolution outcome
    pub status: ResolutionStatus,
}

impl ResolvedPhoto {
    /// Whether this photo is renderable
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, ResolutionStatus::Resolved)
    }
}

/// Orchestrates listing, per-object resolution, and handle lifecycle.
pub struct Catalog {
    client: Arc<ObjectStoreClient>,
    keys: Arc<KeyStore>,
    handles: Mutex<HashMap<String, Arc<ContentHandle>>>,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl Catalog {
    /// Create a catalog over an initialized client and key store
    pub fn new(client: Arc<ObjectStoreClient>, keys: Arc<KeyStore>) -> Self {
        Self {
            client,
            keys,
            handles: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// List the bucket and resolve every object to local content.
    ///
    /// Resolutions run concurrently and unordered; each failure is caught
    /// at single-object granularity, so partial success is the normal
    /// outcome. A listing failure aborts the whole call. The returned
    /// vector preserves listing order (most recent first).
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<Vec<ResolvedPhoto>> {
        let listed = self.client.list().await?;
        {
            let mut objects = self.objects.lock();
            objects.clear();
            for object in &listed {
                objects.insert(object.key.clone(), object.clone());
            }
        }

        Ok(join_all(listed.into_iter().map(|object| self.resolve(object))).await)
    }

    /// Upload a photo, deriving the wire key from the upload time and the
    /// percent-encoded filename. Returns the new object's key.
    ///
    /// When no content type is given it is guessed from the filename. In
    /// client-side mode the payload is AEAD-encrypted before upload.
    #[instrument(skip(self, content))]
    pub async fn store(
        &self,
        filename: &str,
        content: Bytes,
        content_type: Option<&str>,
    ) -> Result<String> {
        let content_type = content_type.map(str::to_string).unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_or_octet_stream()
                .to_string()
        });
        let key = object_key_for(filename, Utc::now());

        let body = match self.client.mode() {
            EncryptionMode::ClientSideAead => {
                let engine = CryptoEngine::new(&self.keys.current()?);
                Bytes::from(engine.encrypt(&content)?)
            }
            EncryptionMode::ServerSideCustomerKey => content,
        };

        self.client.put(&key, body, &content_type).await?;
        Ok(key)
    }

    /// Delete an object and revoke its handle.
    ///
    /// The handle is revoked before the delete goes out: once the user has
    /// asked for removal, a stale local handle must not outlive that
    /// intent, even when the network call fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &str) -> Result<()> {
        if let Some(handle) = self.handles.lock().remove(key) {
            handle.revoke();
        }
        self.objects.lock().remove(key);
        self.client.delete(key).await
    }

    /// Re-resolve a single object from the last listing snapshot, without
    /// re-listing the bucket. Any prior handle for the key is replaced.
    #[instrument(skip(self))]
    pub async fn retry(&self, key: &str) -> Result<ResolvedPhoto> {
        let object = self
            .objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::ObjectNotFound {
                key: key.to_string(),
            })?;
        Ok(self.resolve(object).await)
    }

    /// Number of live handles
    pub fn live_handles(&self) -> usize {
        self.handles.lock().len()
    }

    async fn resolve(&self, object: StoredObject) -> ResolvedPhoto {
        match self.fetch_content(&object.key).await {
            Ok((content, content_type)) => {
                let handle = ContentHandle::new(content, content_type);
                if let Some(old) = self
                    .handles
                    .lock()
                    .insert(object.key.clone(), handle.clone())
                {
                    old.revoke();
                }
                ResolvedPhoto {
                    object,
                    handle: Some(handle),
                    status: ResolutionStatus::Resolved,
                }
            }
            Err(e) => {
                warn!(key = %object.key, error = %e, "failed to resolve object");
                if let Some(old) = self.handles.lock().remove(&object.key) {
                    old.revoke();
                }
                ResolvedPhoto {
                    object,
                    handle: None,
                    status: ResolutionStatus::Failed(e.to_string()),
                }
            }
        }
    }

    async fn fetch_content(&self, key: &str) -> Result<(Bytes, String)> {
        let (body, content_type) = self.client.get(key).await?;
        let content = match self.client.mode() {
            EncryptionMode::ClientSideAead => {
                let engine = CryptoEngine::new(&self.keys.current()?);
                Bytes::from(engine.decrypt(&body)?)
            }
            EncryptionMode::ServerSideCustomerKey => body,
        };
        Ok((
            content,
            content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        ))
    }
}

impl Drop for Catalog {
    fn drop(&mut self) {
        for handle in self.handles.lock().values() {
            handle.revoke();
        }
    }
}
