//! Bucket configuration and the deployment-wide encryption mode.

use crate::{ClientError, Result};
use std::time::Duration;
use url::Url;

/// How photo payloads are protected in the bucket.
///
/// The two strategies are mutually exclusive for a deployment: a blob
/// written in one mode is unreadable in the other, so the mode is part of
/// the immutable bucket configuration rather than a per-object choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionMode {
    /// Payloads are AES-GCM encrypted locally before upload; the bucket
    /// only ever sees self-contained ciphertext blobs
    ClientSideAead,
    /// The bucket encrypts at rest with the customer key supplied in the
    /// headers of every body-bearing request
    ServerSideCustomerKey,
}

/// Connection parameters for one bucket.
///
/// Immutable once a client is constructed; changing anything here means
/// building a new client, not mutating a live one.
#[derive(Clone, Debug)]
pub struct BucketConfig {
    /// Bucket endpoint URL; a bare host gets `https://` prepended
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Signing region
    pub region: String,
    /// Encryption strategy for every object in the bucket
    pub mode: EncryptionMode,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl BucketConfig {
    /// Create a config with the given connection parameters and defaults
    /// for everything else
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: "eu-central-1".to_string(),
            mode: EncryptionMode::ServerSideCustomerKey,
            timeout: Duration::from_secs(30),
            user_agent: format!("obscura-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the encryption mode
    pub fn with_mode(mut self, mode: EncryptionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the whole configuration and return the normalized endpoint.
    ///
    /// Runs exactly once, at client construction. A bare host is given a
    /// secure scheme; anything unparsable is `InvalidEndpoint`.
    pub(crate) fn validate(&self) -> Result<Url> {
        if self.bucket.trim().is_empty() {
            return Err(ClientError::InvalidEndpoint("bucket name is empty".to_string()));
        }
        if self.access_key_id.trim().is_empty() || self.secret_access_key.trim().is_empty() {
            return Err(ClientError::InvalidEndpoint(
                "credentials are incomplete".to_string(),
            ));
        }

        let trimmed = self.endpoint.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidEndpoint("endpoint is empty".to_string()));
        }
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", with_scheme, e)))?;
        if url.host_str().is_none() {
            return Err(ClientError::InvalidEndpoint(format!(
                "{}: missing host",
                with_scheme
            )));
        }
        Ok(url)
    }
}
