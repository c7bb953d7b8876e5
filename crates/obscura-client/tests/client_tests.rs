//! ObjectStoreClient tests against a mock bucket API.
//!
//! Run with: cargo test --package obscura-client --test client_tests

use obscura_client::{BucketConfig, ClientError, EncryptionMode, ObjectStoreClient};
use obscura_crypto::{CryptoError, KeyStore};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

// 0x00..0x1f in canonical encoding, with its digest precomputed out of band
const TEST_KEY_B64: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";
const TEST_KEY_MD5_B64: &str = "tP/LI3N87DFaSk0aoqYgzg==";

const SSE_ALGORITHM_HEADER: &str = "x-amz-server-side-encryption-customer-algorithm";
const SSE_KEY_HEADER: &str = "x-amz-server-side-encryption-customer-key";
const SSE_KEY_MD5_HEADER: &str = "x-amz-server-side-encryption-customer-key-md5";

/// Matches requests that do NOT carry the given header
struct HeaderAbsent(&'static str);

impl Match for HeaderAbsent {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key(self.0)
    }
}

struct TestSetup {
    server: MockServer,
    client: Arc<ObjectStoreClient>,
    _key_dir: tempfile::TempDir,
}

async fn setup(mode: EncryptionMode, with_key: bool) -> TestSetup {
    let server = MockServer::start().await;
    let key_dir = tempfile::tempdir().unwrap();
    let keys = Arc::new(KeyStore::open(key_dir.path()));
    if with_key {
        keys.import(TEST_KEY_B64).unwrap();
    }

    let config = BucketConfig::new(server.uri(), "photos", "AKID", "SECRET").with_mode(mode);
    let client = Arc::new(ObjectStoreClient::new(config, keys).unwrap());

    TestSetup {
        server,
        client,
        _key_dir: key_dir,
    }
}

fn list_xml(entries: &[(&str, &str, u64)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ListBucketResult><Name>photos</Name><IsTruncated>false</IsTruncated>",
    );
    for (key, last_modified, size) in entries {
        body.push_str(&format!(
            "<Contents><Key>{}</Key><LastModified>{}</LastModified><Size>{}</Size></Contents>",
            key, last_modified, size
        ));
    }
    body.push_str("</ListBucketResult>");
    body
}

#[tokio::test]
async fn test_put_attaches_customer_key_header_trio() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("PUT"))
        .and(path("/photos/1700000000000-a.jpg"))
        .and(header(SSE_ALGORITHM_HEADER, "AES256"))
        .and(header(SSE_KEY_HEADER, TEST_KEY_B64))
        .and(header(SSE_KEY_MD5_HEADER, TEST_KEY_MD5_B64))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&t.server)
        .await;

    t.client
        .put("1700000000000-a.jpg", b"pixels".as_ref().into(), "image/jpeg")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_in_client_side_mode_sends_no_key_headers() {
    let t = setup(EncryptionMode::ClientSideAead, true).await;

    Mock::given(method("PUT"))
        .and(path("/photos/1700000000000-a.jpg"))
        .and(HeaderAbsent(SSE_ALGORITHM_HEADER))
        .and(HeaderAbsent(SSE_KEY_HEADER))
        .and(HeaderAbsent(SSE_KEY_MD5_HEADER))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&t.server)
        .await;

    t.client
        .put("1700000000000-a.jpg", b"blob".as_ref().into(), "image/jpeg")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_without_key_fails_before_any_network_call() {
    for mode in [
        EncryptionMode::ServerSideCustomerKey,
        EncryptionMode::ClientSideAead,
    ] {
        let t = setup(mode, false).await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&t.server)
            .await;

        let err = t
            .client
            .put("1700000000000-a.jpg", b"pixels".as_ref().into(), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Crypto(CryptoError::KeyMissing)));
    }
}

#[tokio::test]
async fn test_get_attaches_customer_key_headers_and_returns_body() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("GET"))
        .and(path("/photos/1700000000000-a.jpg"))
        .and(header(SSE_ALGORITHM_HEADER, "AES256"))
        .and(header(SSE_KEY_HEADER, TEST_KEY_B64))
        .and(header(SSE_KEY_MD5_HEADER, TEST_KEY_MD5_B64))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"pixels".to_vec(), "image/png"))
        .expect(1)
        .mount(&t.server)
        .await;

    let (body, content_type) = t.client.get("1700000000000-a.jpg").await.unwrap();
    assert_eq!(&body[..], b"pixels");
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_get_maps_missing_object() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("GET"))
        .and(path("/photos/1700000000000-gone.jpg"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>",
        ))
        .mount(&t.server)
        .await;

    let err = t.client.get("1700000000000-gone.jpg").await.unwrap_err();
    match err {
        ClientError::ObjectNotFound { key } => assert_eq!(key, "1700000000000-gone.jpg"),
        other => panic!("expected ObjectNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_maps_customer_key_mismatch() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("GET"))
        .and(path("/photos/1700000000000-a.jpg"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            "<Error><Code>InvalidArgument</Code>\
             <Message>The provided encryption key does not match the key used to encrypt the object.</Message></Error>",
        ))
        .mount(&t.server)
        .await;

    let err = t.client.get("1700000000000-a.jpg").await.unwrap_err();
    assert!(matches!(err, ClientError::KeyMismatch(_)));
}

#[tokio::test]
async fn test_list_returns_most_recent_first() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    let body = list_xml(&[
        ("1700000000000-a.jpg", "2024-01-01T00:00:00.000Z", 10),
        ("1700000000002-c.jpg", "2024-01-03T00:00:00.000Z", 30),
        ("1700000000001-b.jpg", "2024-01-02T00:00:00.000Z", 20),
    ]);
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("list-type", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&t.server)
        .await;

    let objects = t.client.list().await.unwrap();
    let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        [
            "1700000000002-c.jpg",
            "1700000000001-b.jpg",
            "1700000000000-a.jpg"
        ]
    );
}

#[tokio::test]
async fn test_list_follows_continuation_tokens() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    let first_page = "<ListBucketResult><IsTruncated>true</IsTruncated>\
         <NextContinuationToken>tok</NextContinuationToken>\
         <Contents><Key>1700000000000-a.jpg</Key>\
         <LastModified>2024-01-01T00:00:00.000Z</LastModified><Size>1</Size></Contents>\
         </ListBucketResult>";
    let second_page = list_xml(&[("1700000000001-b.jpg", "2024-01-02T00:00:00.000Z", 2)]);

    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("continuation-token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(second_page))
        .expect(1)
        .mount(&t.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("list-type", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_page))
        .expect(1)
        .mount(&t.server)
        .await;

    let objects = t.client.list().await.unwrap();
    assert_eq!(objects.len(), 2);
}

#[tokio::test]
async fn test_check_connectivity_probes_one_key() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("max-keys", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_xml(&[])))
        .expect(1)
        .mount(&t.server)
        .await;

    t.client.check_connectivity().await.unwrap();
}

#[tokio::test]
async fn test_check_connectivity_surfaces_access_denied() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("GET"))
        .and(path("/photos"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        ))
        .mount(&t.server)
        .await;

    let err = t.client.check_connectivity().await.unwrap_err();
    assert!(err.is_access_denied());
}

#[tokio::test]
async fn test_delete_sends_no_key_material() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("DELETE"))
        .and(path("/photos/1700000000000-a.jpg"))
        .and(HeaderAbsent(SSE_KEY_HEADER))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&t.server)
        .await;

    t.client.delete("1700000000000-a.jpg").await.unwrap();
}

#[tokio::test]
async fn test_put_failure_maps_to_upload_failed() {
    let t = setup(EncryptionMode::ServerSideCustomerKey, true).await;

    Mock::given(method("PUT"))
        .and(path("/photos/1700000000000-a.jpg"))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            "<Error><Code>InternalError</Code><Message>We encountered an internal error.</Message></Error>",
        ))
        .mount(&t.server)
        .await;

    let err = t
        .client
        .put("1700000000000-a.jpg", b"pixels".as_ref().into(), "image/jpeg")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UploadFailed(_)));
}
