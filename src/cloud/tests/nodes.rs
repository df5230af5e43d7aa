use std::cell::{Cell, RefCell};
use std::path::PathBuf;

use serde_json::json;

use super::stub::StubServer;
use crate::cloud::{
    AzureImageInput, AzureImageNode, AzureVideoInput, AzureVideoNode, CloudError, Delivery,
    ObjectStore, Provider, S3ImageInput, S3ImageNode, S3VideoInput, S3VideoNode, VhsFilenames,
};
use crate::tensor::Tensor;

/// 记录上传内容的内存存储
struct MemoryStore {
    provider: Provider,
    prepared: Cell<bool>,
    objects: RefCell<Vec<(String, Vec<u8>, String)>>,
}

impl MemoryStore {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            prepared: Cell::new(false),
            objects: RefCell::new(Vec::new()),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn prepare(&self) -> Result<(), CloudError> {
        self.prepared.set(true);
        Ok(())
    }

    fn put_object(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), CloudError> {
        self.objects
            .borrow_mut()
            .push((key.to_string(), bytes.to_vec(), content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("mem://{key}")
    }

    fn signed_url(&self, key: &str, expires: u64) -> Result<String, CloudError> {
        Ok(format!("mem://{key}?expires={expires}"))
    }
}

fn image() -> Tensor {
    Tensor::new(&[0.25; 2 * 2 * 3], &[1, 2, 2, 3])
}

fn video_file(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"0123456789").unwrap();
    path
}

#[test]
fn test_s3_image_upload() {
    let store = MemoryStore::new(Provider::S3);
    let input = S3ImageInput {
        bucket: "b".to_string(),
        ..Default::default()
    };
    let (passed, output) = S3ImageNode::default().upload_to(&store, &image(), &input).unwrap();

    assert_eq!(passed, image());
    assert!(output.key.starts_with("comfy/") && output.key.ends_with(".png"));
    assert!(!output.key.contains("{timestamp}"));
    assert_eq!(output.url, format!("mem://{}", output.key));
    assert_eq!(output.delivery, Delivery::Skipped);

    let objects = store.objects.borrow();
    let (key, bytes, mime) = &objects[0];
    assert_eq!(key, &output.key);
    assert_eq!(&bytes[..4], b"\x89PNG");
    assert_eq!(bytes.len(), output.size_bytes);
    assert_eq!(mime, "image/png");
}

#[test]
fn test_s3_image_signed_url_uses_default_expiry() {
    let store = MemoryStore::new(Provider::S3);
    let input = S3ImageInput {
        use_signed_url: true,
        ..Default::default()
    };
    let (_, output) = S3ImageNode::default().upload_to(&store, &image(), &input).unwrap();
    assert!(output.url.ends_with("?expires=3600"));
}

#[test]
fn test_s3_video_upload() {
    let dir = tempfile::tempdir().unwrap();
    let path = video_file(dir.path(), "clip.mp4");
    let store = MemoryStore::new(Provider::S3);
    let input = S3VideoInput {
        file_path: format!("  {}  ", path.display()),
        use_signed_url: true,
        signed_expires: 10,
        ..Default::default()
    };
    let output = S3VideoNode::default().upload_to(&store, &input).unwrap();

    assert_eq!(output.key, "comfyui/videos/clip.mp4");
    assert_eq!(output.size_bytes, 10);
    // 有效期被限制到下限60秒
    assert_eq!(output.url, "mem://comfyui/videos/clip.mp4?expires=60");
    assert_eq!(store.objects.borrow()[0].2, "video/mp4");
}

#[test]
fn test_video_source_from_vhs() {
    let dir = tempfile::tempdir().unwrap();
    let png = video_file(dir.path(), "frame.png");
    let mp4 = video_file(dir.path(), "final.mp4");
    let store = MemoryStore::new(Provider::S3);
    let input = S3VideoInput {
        file_path: "/does/not/matter.mp4".to_string(),
        vhs_filenames: Some(VhsFilenames::new(true, vec![png.clone(), mp4])),
        ..Default::default()
    };
    let output = S3VideoNode::default().upload_to(&store, &input).unwrap();
    assert_eq!(output.key, "comfyui/videos/final.mp4");

    // 索引越界时退回file_path
    let input = S3VideoInput {
        file_path: png.display().to_string(),
        vhs_filenames: Some(VhsFilenames::new(true, vec![])),
        ..Default::default()
    };
    let output = S3VideoNode::default().upload_to(&store, &input).unwrap();
    assert_eq!(output.key, "comfyui/videos/frame.png");
}

#[test]
fn test_missing_video_fails_before_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.mp4");

    let s3 = S3VideoInput {
        file_path: missing.display().to_string(),
        ..Default::default()
    };
    assert!(matches!(S3VideoNode::default().upload(&s3), Err(CloudError::FileNotFound(p)) if p == missing));

    let azure = AzureVideoInput {
        file_path: missing.display().to_string(),
        ..Default::default()
    };
    assert!(matches!(AzureVideoNode::default().upload(&azure), Err(CloudError::FileNotFound(_))));

    let store = MemoryStore::new(Provider::S3);
    assert!(matches!(
        S3VideoNode::default().upload_to(&store, &S3VideoInput::default()),
        Err(CloudError::FileNotFound(_))
    ));
    assert!(store.objects.borrow().is_empty());
}

#[test]
fn test_video_callback_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = video_file(dir.path(), "clip.mp4");
    let server = StubServer::serve(vec![204]);
    let store = MemoryStore::new(Provider::S3);
    let input = S3VideoInput {
        file_path: path.display().to_string(),
        callback_url: format!("{}/callback", server.url),
        ..Default::default()
    };
    let output = S3VideoNode::default().upload_to(&store, &input).unwrap();
    assert_eq!(output.delivery, Delivery::Delivered { status: 204 });

    let requests = server.finish();
    assert_eq!(
        requests[0].json(),
        json!({
            "url": "mem://comfyui/videos/clip.mp4",
            "provider": "s3",
            "mime": "video/mp4",
            "size_bytes": 10
        })
    );
}

#[test]
fn test_azure_image_upload() {
    let server = StubServer::serve(vec![200]);
    let store = MemoryStore::new(Provider::Azure);
    let input = AzureImageInput {
        callback_url: server.url.clone(),
        ..Default::default()
    };
    let (passed, output) = AzureImageNode::default().upload_to(&store, &image(), &input).unwrap();
    assert_eq!(passed, image());
    assert!(store.prepared.get());
    assert!(output.key.starts_with("comfyui/images/") && output.key.ends_with(".png"));

    let requests = server.finish();
    let body = requests[0].json();
    assert_eq!(body["provider"], "azure");
    assert_eq!(body["path"], output.key.as_str());
    assert_eq!(body["mime"], "image/png");
    assert_eq!(body["size_bytes"], output.size_bytes);
}

#[test]
fn test_azure_video_upload() {
    let dir = tempfile::tempdir().unwrap();
    let path = video_file(dir.path(), "clip.mp4");
    let store = MemoryStore::new(Provider::Azure);
    let input = AzureVideoInput {
        file_path: path.display().to_string(),
        blob_name_template: String::new(),
        ..Default::default()
    };
    let output = AzureVideoNode::default().upload_to(&store, &input).unwrap();
    // 模板为空时使用默认模板
    assert_eq!(output.key, "comfyui/videos/clip.mp4");
    assert_eq!(output.url, "mem://comfyui/videos/clip.mp4");
}

#[test]
fn test_azure_store_from_input() {
    let input = AzureImageInput {
        container_name: " ".to_string(),
        connection_string: "AccountName=acct;AccountKey=YWJjZA==".to_string(),
        ..Default::default()
    };
    let store = AzureImageNode::store(&input).unwrap();
    assert_eq!(store.container(), "images");
    assert_eq!(store.container_url(), "https://acct.blob.core.windows.net/images");
}

#[test]
fn test_input_defaults() {
    let input = S3VideoInput::default();
    assert_eq!(input.key_template, "comfyui/videos/{basename}");
    assert_eq!(input.signed_expires, 3600);
    assert_eq!(input.prefer_index, -1);

    let input: AzureImageInput = serde_json::from_value(json!({"use_signed_url": true})).unwrap();
    assert!(input.use_signed_url);
    assert_eq!(input.container_name, "images");
    assert_eq!(input.blob_name_template, "comfyui/images/{timestamp}.png");
}
