//! Bucket client: translates catalog operations into object API calls.
//!
//! Path-style requests against any S3-compatible endpoint, signed with
//! Signature V4. In customer-key mode the per-request header trio
//! (algorithm, key, key digest) is derived from the key store on every
//! body-bearing call; in client-side mode bodies arrive pre-encrypted and
//! no key material goes over the wire.

use crate::sign::{uri_encode, RequestSigner};
use crate::types::{sort_for_listing, StoredObject};
use crate::{xml, BucketConfig, ClientError, EncryptionMode, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use obscura_crypto::KeyStore;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Customer-key (SSE-C) header names
const SSE_ALGORITHM_HEADER: &str = "x-amz-server-side-encryption-customer-algorithm";
const SSE_KEY_HEADER: &str = "x-amz-server-side-encryption-customer-key";
const SSE_KEY_MD5_HEADER: &str = "x-amz-server-side-encryption-customer-key-md5";

/// Fixed algorithm identifier for 256-bit customer-key encryption
const SSE_ALGORITHM: &str = "AES256";

/// Client for one bucket, one credential pair, one encryption mode.
pub struct ObjectStoreClient {
    config: BucketConfig,
    endpoint: Url,
    signer: RequestSigner,
    keys: Arc<KeyStore>,
    http: Client,
}

impl ObjectStoreClient {
    /// Construct a client for one bucket.
    ///
    /// The whole configuration is validated here; a client that constructs
    /// successfully never fails on configuration later. Reconfiguring means
    /// constructing a new client.
    pub fn new(config: BucketConfig, keys: Arc<KeyStore>) -> Result<Self> {
        let endpoint = config.validate()?;
        let signer = RequestSigner::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.region.clone(),
        );
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;

        Ok(Self {
            config,
            endpoint,
            signer,
            keys,
            http,
        })
    }

    /// The deployment's encryption mode
    pub fn mode(&self) -> EncryptionMode {
        self.config.mode
    }

    /// Get the configuration
    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Upload an object body under the given wire key.
    ///
    /// Fails with `KeyMissing` before any network I/O when no encryption
    /// key has been loaded, in either mode.
    #[instrument(skip(self, body))]
    pub async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let mut headers = vec![("content-type".to_string(), content_type.to_string())];
        match self.config.mode {
            EncryptionMode::ServerSideCustomerKey => {
                headers.extend(self.customer_key_headers()?);
            }
            EncryptionMode::ClientSideAead => {
                // bodies in this mode come out of the AEAD engine, which
                // needs the same key; gate here so a missing key never
                // reaches the network
                self.keys.current()?;
            }
        }

        match self.request("PUT", Some(key), &[], headers, Some(body)).await {
            Ok(_) => Ok(()),
            Err(ClientError::Api { code, message, .. }) => {
                Err(ClientError::UploadFailed(format!("{}: {}", code, message)))
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch an object body and its content type
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<(Bytes, Option<String>)> {
        let mut headers = Vec::new();
        if self.config.mode == EncryptionMode::ServerSideCustomerKey {
            headers.extend(self.customer_key_headers()?);
        }

        let response = self.request("GET", Some(key), &[], headers, None).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;

        Ok((body, content_type))
    }

    /// Delete an object. Not body-bearing, so no key material is attached.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.request("DELETE", Some(key), &[], Vec::new(), None)
            .await?;
        Ok(())
    }

    /// List every object in the bucket, most recently modified first;
    /// ties are broken by key descending. Follows continuation tokens, so
    /// the result is the complete listing.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![("list-type", "2".to_string())];
            if let Some(t) = &token {
                query.push(("continuation-token", t.clone()));
            }

            let response = self.request("GET", None, &query, Vec::new(), None).await?;
            let text = response
                .text()
                .await
                .map_err(|e| ClientError::Connectivity(e.to_string()))?;

            let (page, next) = parse_list_response(&text);
            objects.extend(page);
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        sort_for_listing(&mut objects);
        Ok(objects)
    }

    /// Issue a minimal read-only probe proving that the credentials and the
    /// bucket's cross-origin policy are usable, before any real traffic.
    #[instrument(skip(self))]
    pub async fn check_connectivity(&self) -> Result<()> {
        let query = [
            ("list-type", "2".to_string()),
            ("max-keys", "1".to_string()),
        ];
        self.request("GET", None, &query, Vec::new(), None).await?;
        Ok(())
    }

    /// The per-request header trio for customer-key encryption, derived
    /// fresh from the key store on every call.
    ///
    /// The key travels as standard base64 of the 32 raw bytes and the
    /// digest is MD5 over those same raw bytes. A digest computed over any
    /// textual encoding instead gets every request rejected by a
    /// validating server.
    fn customer_key_headers(&self) -> Result<Vec<(String, String)>> {
        let key = self.keys.current()?;
        Ok(vec![
            (SSE_ALGORITHM_HEADER.to_string(), SSE_ALGORITHM.to_string()),
            (SSE_KEY_HEADER.to_string(), key.to_base64()),
            (SSE_KEY_MD5_HEADER.to_string(), key.md5_digest_base64()),
        ])
    }

    fn url_for(&self, key: Option<&str>, query: &[(&str, String)]) -> Url {
        let mut url = self.endpoint.clone();
        let path = match key {
            Some(k) => format!("/{}/{}", uri_encode(&self.config.bucket), uri_encode(k)),
            None => format!("/{}", uri_encode(&self.config.bucket)),
        };
        url.set_path(&path);

        if !query.is_empty() {
            // pre-sorted and pre-encoded: the query string doubles as the
            // canonical query in the signature
            let mut pairs: Vec<String> = query
                .iter()
                .map(|(name, value)| format!("{}={}", uri_encode(name), uri_encode(value)))
                .collect();
            pairs.sort();
            url.set_query(Some(&pairs.join("&")));
        }
        url
    }

    async fn request(
        &self,
        method: &str,
        key: Option<&str>,
        query: &[(&str, String)],
        mut headers: Vec<(String, String)>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response> {
        let url = self.url_for(key, query);
        let payload_hash = hex::encode(Sha256::digest(body.as_deref().unwrap_or(&[])));

        headers.push(("host".to_string(), host_header(&url)));
        headers.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
        let authorization =
            self.signer
                .sign(method, &url, &mut headers, &payload_hash, Utc::now());

        let mut request = match method {
            "GET" => self.http.get(url.clone()),
            "PUT" => self.http.put(url.clone()),
            "DELETE" => self.http.delete(url.clone()),
            other => {
                return Err(ClientError::Connectivity(format!(
                    "unsupported method: {}",
                    other
                )))
            }
        };

        for (name, value) in &headers {
            // reqwest sets host itself from the URL
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        request = request.header("authorization", authorization);
        if let Some(data) = body {
            request = request.body(data);
        }

        debug!(%url, method, "sending bucket request");
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(&text, status.as_u16(), key));
        }

        Ok(response)
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn parse_list_response(body: &str) -> (Vec<StoredObject>, Option<String>) {
    let is_truncated = xml::extract_value(body, "IsTruncated")
        .map(|s| s == "true")
        .unwrap_or(false);
    let next_token = if is_truncated {
        xml::extract_value(body, "NextContinuationToken")
    } else {
        None
    };

    let mut objects = Vec::new();
    let mut pos = 0;
    while let Some(start) = body[pos..].find("<Contents>") {
        let start = pos + start;
        let Some(end) = body[start..].find("</Contents>") else {
            break;
        };
        let entry = &body[start..start + end + "</Contents>".len()];
        if let Some(key) = xml::extract_value(entry, "Key") {
            objects.push(StoredObject {
                key,
                last_modified: xml::extract_value(entry, "LastModified")
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now),
                size: xml::extract_value(entry, "Size")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
            });
        }
        pos = start + end + "</Contents>".len();
    }

    (objects, next_token)
}
