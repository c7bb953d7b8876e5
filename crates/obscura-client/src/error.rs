//! Client error types

use crate::xml;
use obscura_crypto::CryptoError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bucket endpoint could not be parsed
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Credentials or bucket policy rejected the request
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Network or cross-origin failure before an API response was produced
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Object does not exist in the bucket
    #[error("object not found: {key}")]
    ObjectNotFound { key: String },

    /// The customer key or its digest does not match what the object was
    /// stored with
    #[error("customer key mismatch: {0}")]
    KeyMismatch(String),

    /// Upload rejected by the bucket
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Any other bucket API error
    #[error("bucket API error ({code}): {message}")]
    Api {
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// Key lifecycle or cipher failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ClientError {
    /// Map an error response body and status onto the client taxonomy.
    ///
    /// `key` is the object key of the failing call, when the call had one.
    pub(crate) fn from_response(body: &str, status: u16, key: Option<&str>) -> Self {
        let code = xml::extract_value(body, "Code").unwrap_or_else(|| format!("HTTP{}", status));
        let message =
            xml::extract_value(body, "Message").unwrap_or_else(|| "unknown error".to_string());
        let request_id = xml::extract_value(body, "RequestId");

        // a wrong customer key or digest surfaces as a 400 that names the
        // encryption key, not as a dedicated error code
        let mentions_key = {
            let lower = message.to_ascii_lowercase();
            lower.contains("encryption key") || lower.contains("key md5") || lower.contains("customer key")
        };

        match code.as_str() {
            "NoSuchKey" | "NotFound" => ClientError::ObjectNotFound {
                key: key.unwrap_or_default().to_string(),
            },
            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
                ClientError::AccessDenied(message)
            }
            "InvalidArgument" | "InvalidDigest" if mentions_key => ClientError::KeyMismatch(message),
            _ if status == 404 => ClientError::ObjectNotFound {
                key: key.unwrap_or_default().to_string(),
            },
            _ if status == 403 => ClientError::AccessDenied(message),
            _ => ClientError::Api {
                code,
                message,
                request_id,
            },
        }
    }

    /// Whether the error indicates a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }

    /// Whether the error indicates rejected credentials or policy
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }
}
