//! # Obscura Client
//!
//! Encrypted photo storage on any S3-compatible bucket. The bucket
//! operator never sees plaintext: payloads are protected either by
//! client-side AES-GCM or by server-side customer-supplied-key encryption,
//! fixed per deployment.
//!
//! ## Example
//!
//! ```rust,ignore
//! use obscura_client::{BucketConfig, Catalog, EncryptionMode, ObjectStoreClient};
//! use obscura_crypto::KeyStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let keys = Arc::new(KeyStore::open("~/.config/obscura"));
//!     keys.load().or_else(|_| keys.generate())?;
//!
//!     let config = BucketConfig::new(
//!         "storage.example.com",
//!         "my-photos",
//!         "ACCESS_KEY_ID",
//!         "SECRET_ACCESS_KEY",
//!     )
//!     .with_mode(EncryptionMode::ServerSideCustomerKey);
//!
//!     let client = Arc::new(ObjectStoreClient::new(config, keys.clone())?);
//!     client.check_connectivity().await?;
//!
//!     let catalog = Catalog::new(client, keys);
//!     let photo_key = catalog
//!         .store("sunset.jpg", std::fs::read("sunset.jpg")?.into(), None)
//!         .await?;
//!
//!     for photo in catalog.sync().await? {
//!         println!("{}: resolved={}", photo.object.filename(), photo.is_resolved());
//!     }
//!
//!     catalog.remove(&photo_key).await?;
//!     Ok(())
//! }
//! ```

mod catalog;
mod client;
mod config;
mod error;
mod sign;
mod types;
mod xml;

pub use catalog::{Catalog, ContentHandle, ResolutionStatus, ResolvedPhoto};
pub use client::ObjectStoreClient;
pub use config::{BucketConfig, EncryptionMode};
pub use error::{ClientError, Result};
pub use types::{filename_from_key, object_key_for, StoredObject};
