use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};

use super::stub::StubServer;
use crate::cloud::{
    API_VERSION, AzureAuth, AzureBlobStore, AzureConfig, CloudError, ConnectionString, ObjectStore,
    Provider, hmac_sha256, sas_string_to_sign, shared_key_string_to_sign, uri_encode,
};

const KEY: &str = "YWJjZA==";

#[test]
fn test_parse_connection_string() {
    let parsed = ConnectionString::parse(
        "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=YWJjZA==;EndpointSuffix=core.chinacloudapi.cn;QueueEndpoint=x",
    )
    .unwrap();
    assert_eq!(parsed.account_name.as_deref(), Some("acct"));
    // 密钥中的`=`保留
    assert_eq!(parsed.account_key.as_deref(), Some(KEY));
    assert_eq!(parsed.blob_endpoint(), "https://acct.blob.core.chinacloudapi.cn");
    assert_eq!(parsed.account_name(), "acct");

    let parsed = ConnectionString::parse("AccountName=acct;AccountKey=YWJjZA==").unwrap();
    assert_eq!(parsed.blob_endpoint(), "https://acct.blob.core.windows.net");
}

#[test]
fn test_parse_sas_connection_string() {
    let config = AzureConfig::from_connection_string(
        "BlobEndpoint=https://acct.blob.core.windows.net/;SharedAccessSignature=?sv=2022-11-02&sig=abc",
    )
    .unwrap();
    assert_eq!(config.endpoint, "https://acct.blob.core.windows.net");
    assert_eq!(config.account_name, "acct");
    assert_eq!(config.auth, AzureAuth::Sas("sv=2022-11-02&sig=abc".to_string()));
    assert_eq!(config.account_key(), None);
}

#[test]
fn test_invalid_connection_strings() {
    for input in ["AccountName=acct", "AccountKey=YWJjZA==", "garbage"] {
        assert!(
            matches!(ConnectionString::parse(input), Err(CloudError::InvalidConnectionString(_))),
            "{input}"
        );
    }
}

#[test]
fn test_connection_string_debug_is_redacted() {
    let parsed = ConnectionString::parse("AccountName=acct;AccountKey=c2VjcmV0LWtleQ==").unwrap();
    assert!(!format!("{parsed:?}").contains("c2VjcmV0LWtleQ=="));
}

#[test]
fn test_resolve_priority() {
    // 连接字符串优先于账户名+密钥
    let config = AzureConfig::resolve("AccountName=fromcs;AccountKey=YWJjZA==", "acct", KEY).unwrap();
    assert_eq!(config.account_name, "fromcs");

    let config = AzureConfig::resolve("", " acct ", KEY).unwrap();
    assert_eq!(config.account_name, "acct");
    assert_eq!(config.endpoint, "https://acct.blob.core.windows.net");
    assert_eq!(config.account_key(), Some(KEY));
}

#[test]
fn test_resolve_missing_credentials() {
    let env_set = ["AZURE_STORAGE_CONNECTION_STRING", "AZURE_STORAGE_ACCOUNT", "AZURE_STORAGE_KEY"]
        .iter()
        .any(|name| std::env::var_os(name).is_some());
    if env_set {
        return;
    }
    assert!(matches!(
        AzureConfig::resolve("", "acct", ""),
        Err(CloudError::MissingCredentials(_))
    ));
}

#[test]
fn test_shared_key_string_to_sign_layout() {
    let headers = BTreeMap::from([
        ("x-ms-version".to_string(), API_VERSION.to_string()),
        ("x-ms-blob-type".to_string(), "BlockBlob".to_string()),
        ("x-ms-date".to_string(), "Tue, 02 Jan 2024 03:04:05 GMT".to_string()),
    ]);
    let string_to_sign = shared_key_string_to_sign(
        "PUT",
        11,
        "video/mp4",
        &headers,
        "acct",
        "/videos/clip.mp4",
        &BTreeMap::new(),
    );
    assert_eq!(
        string_to_sign,
        "PUT\n\n\n11\n\nvideo/mp4\n\n\n\n\n\n\n\
         x-ms-blob-type:BlockBlob\n\
         x-ms-date:Tue, 02 Jan 2024 03:04:05 GMT\n\
         x-ms-version:2022-11-02\n\
         /acct/videos/clip.mp4"
    );

    // 长度为0时留空；查询参数追加在资源之后
    let query = BTreeMap::from([("restype".to_string(), "container".to_string())]);
    let string_to_sign =
        shared_key_string_to_sign("PUT", 0, "", &BTreeMap::new(), "acct", "/videos", &query);
    assert_eq!(string_to_sign, "PUT\n\n\n\n\n\n\n\n\n\n\n\n/acct/videos\nrestype:container");
}

#[test]
fn test_sas_string_to_sign_layout() {
    let string_to_sign = sas_string_to_sign("acct", "videos", "a/b.mp4", "2024-01-02T04:04:05Z");
    assert_eq!(
        string_to_sign,
        "r\n\n2024-01-02T04:04:05Z\n/blob/acct/videos/a/b.mp4\n\n\n\n2022-11-02\nb\n\n\n\n\n\n\n"
    );
}

#[test]
fn test_signed_url() {
    let store = AzureBlobStore::new(AzureConfig::from_account("acct", KEY), "videos").unwrap();
    assert_eq!(store.provider(), Provider::Azure);
    assert_eq!(
        store.public_url("comfyui/videos/a b.mp4"),
        "https://acct.blob.core.windows.net/videos/comfyui/videos/a%20b.mp4"
    );

    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let query = store.sas_query_at("a/b.mp4", 3600, now).unwrap();
    let string_to_sign = sas_string_to_sign("acct", "videos", "a/b.mp4", "2024-01-02T04:04:05Z");
    let signature = STANDARD.encode(
        hmac_sha256(&STANDARD.decode(KEY).unwrap(), string_to_sign.as_bytes()).unwrap(),
    );
    assert_eq!(
        query,
        format!(
            "se=2024-01-02T04%3A04%3A05Z&sp=r&sv=2022-11-02&sr=b&sig={}",
            uri_encode(&signature, true)
        )
    );
}

#[test]
fn test_empty_container_rejected() {
    assert!(matches!(
        AzureBlobStore::new(AzureConfig::from_account("acct", KEY), " "),
        Err(CloudError::InvalidInput(_))
    ));
}

fn emulator_store(endpoint: &str) -> AzureBlobStore {
    let connection_string = format!(
        "DefaultEndpointsProtocol=http;AccountName=devacct;AccountKey={KEY};BlobEndpoint={endpoint}/devacct"
    );
    AzureBlobStore::new(AzureConfig::from_connection_string(&connection_string).unwrap(), "videos").unwrap()
}

#[test]
fn test_create_container() {
    let server = StubServer::serve(vec![201, 409]);
    let store = emulator_store(&server.url);
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert!(store.create_container_at(now).unwrap());
    // 已存在
    assert!(!store.create_container_at(now).unwrap());

    let requests = server.finish();
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].target, "/devacct/videos?restype=container");
    assert!(requests[0].header("authorization").unwrap().starts_with("SharedKey devacct:"));
}

#[test]
fn test_create_container_other_errors_propagate() {
    let server = StubServer::serve(vec![403]);
    let store = emulator_store(&server.url);
    let result = store.create_container();
    server.finish();
    assert!(matches!(result, Err(CloudError::Http { status: 403, .. })));
}

#[test]
fn test_put_blob_request() {
    let server = StubServer::serve(vec![201]);
    let store = emulator_store(&server.url);
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    store.put_blob_at("comfyui/clip.mp4", b"video-bytes", "video/mp4", now).unwrap();

    let requests = server.finish();
    let request = &requests[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.target, "/devacct/videos/comfyui/clip.mp4");
    assert_eq!(request.body, b"video-bytes");
    assert_eq!(request.header("x-ms-blob-type"), Some("BlockBlob"));
    assert_eq!(request.header("x-ms-version"), Some(API_VERSION));
    assert_eq!(request.header("x-ms-date"), Some("Tue, 02 Jan 2024 03:04:05 GMT"));

    let headers = BTreeMap::from([
        ("x-ms-blob-type".to_string(), "BlockBlob".to_string()),
        ("x-ms-date".to_string(), "Tue, 02 Jan 2024 03:04:05 GMT".to_string()),
        ("x-ms-version".to_string(), API_VERSION.to_string()),
    ]);
    let string_to_sign = shared_key_string_to_sign(
        "PUT",
        11,
        "video/mp4",
        &headers,
        "devacct",
        "/devacct/videos/comfyui/clip.mp4",
        &BTreeMap::new(),
    );
    let signature = STANDARD.encode(
        hmac_sha256(&STANDARD.decode(KEY).unwrap(), string_to_sign.as_bytes()).unwrap(),
    );
    assert_eq!(
        request.header("authorization"),
        Some(format!("SharedKey devacct:{signature}").as_str())
    );
}

#[test]
fn test_put_blob_with_sas_token() {
    let server = StubServer::serve(vec![201]);
    let connection_string = format!(
        "BlobEndpoint={}/devacct;SharedAccessSignature=sv=2022-11-02&sig=abc",
        server.url
    );
    let store =
        AzureBlobStore::new(AzureConfig::from_connection_string(&connection_string).unwrap(), "images").unwrap();
    store.put_object("a.png", b"png", "image/png").unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].target, "/devacct/images/a.png?sv=2022-11-02&sig=abc");
    assert_eq!(requests[0].header("authorization"), None);
}
