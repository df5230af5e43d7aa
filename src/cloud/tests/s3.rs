use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider, future};
use chrono::{TimeZone, Utc};

use super::stub::{StubServer, closed_url};
use crate::cloud::{CloudError, ObjectStore, Provider, S3Config, S3Store, resolve_credentials};

fn config(region: &str) -> S3Config {
    S3Config::new("my-bucket")
        .unwrap()
        .with_region(region)
        .with_static_credentials("AKIDEXAMPLE", "secret", None)
        .unwrap()
}

fn aws_store() -> S3Store {
    S3Store::connect(config("eu-west-1")).unwrap()
}

fn endpoint_store(endpoint: &str) -> S3Store {
    S3Store::connect(config("us-east-1").with_endpoint(endpoint)).unwrap()
}

/// 什么凭据也给不出的提供者
#[derive(Debug)]
struct NoCredentials;

impl ProvideCredentials for NoCredentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Err(CredentialsError::not_loaded("没有任何凭据来源")))
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn test_config_validation() {
    assert!(matches!(S3Config::new("  "), Err(CloudError::InvalidInput(_))));
    let config = S3Config::new(" b ")
        .unwrap()
        .with_region(" ap-south-1 ")
        .with_endpoint("http://localhost:9000/");
    assert_eq!(config.bucket, "b");
    assert_eq!(config.region.as_deref(), Some("ap-south-1"));
    assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
    assert_eq!(config.clone().with_endpoint("").endpoint, None);
    assert_eq!(config.with_region("").region, None);
}

#[test]
fn test_incomplete_static_credentials() {
    let bucket = S3Config::new("b").unwrap();
    assert!(matches!(
        bucket.clone().with_static_credentials("AKIDEXAMPLE", " ", None),
        Err(CloudError::MissingCredentials(_))
    ));
    assert!(matches!(
        bucket.with_static_credentials("", "secret", None),
        Err(CloudError::MissingCredentials(_))
    ));
}

#[test]
fn test_provider_without_credentials() {
    let provider = SharedCredentialsProvider::new(NoCredentials);
    assert!(matches!(
        block_on(resolve_credentials(&provider)),
        Err(CloudError::MissingCredentials(message)) if message.contains("没有任何凭据来源")
    ));
}

#[test]
fn test_connect_without_any_credentials() {
    // 只在本机没有任何AWS凭据来源时才有意义
    let env_set = [
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_PROFILE",
        "AWS_SHARED_CREDENTIALS_FILE",
        "AWS_CONFIG_FILE",
        "AWS_WEB_IDENTITY_TOKEN_FILE",
        "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
        "AWS_CONTAINER_CREDENTIALS_FULL_URI",
    ]
    .iter()
    .any(|name| std::env::var_os(name).is_some());
    let profile_dir = std::env::var_os("HOME").is_some_and(|home| std::path::Path::new(&home).join(".aws").exists());
    if env_set || profile_dir {
        return;
    }
    let config = S3Config::new("my-bucket").unwrap().with_region("us-east-1");
    assert!(matches!(S3Store::connect(config), Err(CloudError::MissingCredentials(_))));
}

#[test]
fn test_explicit_region_wins() {
    let store = S3Store::connect(config(" ap-south-1 ")).unwrap();
    assert_eq!(store.region(), "ap-south-1");
}

#[test]
fn test_urls() {
    let store = aws_store();
    assert_eq!(store.provider(), Provider::S3);
    assert_eq!(store.public_url("comfy/1.png"), "https://my-bucket/comfy/1.png");
    assert_eq!(
        store.object_url("dir/a b.png"),
        "https://my-bucket.s3.eu-west-1.amazonaws.com/dir/a%20b.png"
    );

    let custom = endpoint_store("http://127.0.0.1:9000");
    assert_eq!(custom.object_url("k.png"), "http://127.0.0.1:9000/my-bucket/k.png");
    assert_eq!(custom.public_url("k.png"), custom.object_url("k.png"));
}

#[test]
fn test_presigned_url() {
    let store = aws_store();
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap().into();
    let url = store.presigned_url_at("comfy/1.png", 3600, start).unwrap();

    let (base, query) = url.split_once('?').unwrap();
    assert_eq!(base, "https://my-bucket.s3.eu-west-1.amazonaws.com/comfy/1.png");
    assert!(query.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
    assert!(query.contains("X-Amz-Credential=AKIDEXAMPLE%2F20240102%2Feu-west-1%2Fs3%2Faws4_request"));
    assert!(query.contains("X-Amz-Date=20240102T030405Z"));
    assert!(query.contains("X-Amz-Expires=3600"));
    assert!(query.contains("X-Amz-Signature="));

    let custom = endpoint_store("http://127.0.0.1:9000");
    let url = custom.presigned_url_at("k.png", 60, start).unwrap();
    assert!(url.starts_with("http://127.0.0.1:9000/my-bucket/k.png?"));
    assert!(url.contains("X-Amz-Expires=60"));
}

#[test]
fn test_put_object_request() {
    let server = StubServer::serve(vec![200]);
    let store = endpoint_store(&server.url);
    store.put_object("dir/clip 1.mp4", b"video-bytes", "video/mp4").unwrap();

    let requests = server.finish();
    let request = &requests[0];
    assert_eq!(request.method, "PUT");
    let path = request.target.split('?').next().unwrap();
    assert_eq!(path, "/my-bucket/dir/clip%201.mp4");
    assert_eq!(request.body, b"video-bytes");
    assert_eq!(request.header("content-type"), Some("video/mp4"));
    let authorization = request.header("authorization").unwrap();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/s3/aws4_request"));
}

#[test]
fn test_put_object_error_status() {
    let server = StubServer::serve(vec![403]);
    let store = endpoint_store(&server.url);
    let result = store.put_object("k", b"x", "image/png");
    server.finish();
    assert!(matches!(result, Err(CloudError::Http { status: 403, .. })));
}

#[test]
fn test_put_object_unreachable() {
    let store = endpoint_store(&closed_url());
    assert!(matches!(
        store.put_object("k", b"x", "image/png"),
        Err(CloudError::Transport(_))
    ));
}
