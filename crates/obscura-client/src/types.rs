//! Remote object records and the on-wire object key format.
//!
//! Wire keys are `<unix-epoch-ms>-<percent-encoded-filename>`: the numeric
//! prefix is non-decreasing with upload order and the suffix round-trips
//! through percent-decoding back to the original filename.

use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Characters left literal by the filename encoding; everything else is
/// percent-encoded. Matches the `encodeURIComponent` set so keys written by
/// existing galleries decode unchanged.
const FILENAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A remote object as reported by the bucket listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredObject {
    /// Wire key: `<epoch-ms>-<percent-encoded-filename>`
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified time
    pub last_modified: DateTime<Utc>,
}

impl StoredObject {
    /// Display filename, percent-decoded from the key suffix
    pub fn filename(&self) -> String {
        filename_from_key(&self.key)
    }

    /// Upload timestamp embedded in the key prefix, if parsable
    pub fn uploaded_at_ms(&self) -> Option<i64> {
        self.key.split('-').next()?.parse().ok()
    }
}

/// Build the wire key for a new upload
pub fn object_key_for(filename: &str, uploaded_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        uploaded_at.timestamp_millis(),
        utf8_percent_encode(filename, FILENAME_SET)
    )
}

/// Recover the original filename from a wire key.
///
/// Everything after the first `-` is the encoded name; a key without the
/// separator decodes as its whole self.
pub fn filename_from_key(key: &str) -> String {
    let encoded = key.split_once('-').map(|(_, rest)| rest).unwrap_or(key);
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

/// Listing order: most recently modified first, ties broken by key
/// descending. The key's millisecond prefix makes the tie-break equal to
/// upload order for collisions within one millisecond.
pub(crate) fn sort_for_listing(objects: &mut [StoredObject]) {
    objects.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| b.key.cmp(&a.key))
    });
}
