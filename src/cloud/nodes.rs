//! 四个上传节点。节点只负责准备内容、渲染对象键与组装回调，
//! 实际的上传由[`ObjectStore`]完成，便于替换与测试

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::azure::VIDEO_CONTAINER_ENV;
use super::{
    AzureBlobStore, AzureConfig, CallbackPayload, CloudError, DEFAULT_SIGNED_EXPIRES, KeyTemplate,
    Notifier, ObjectStore, S3Config, S3Store, UploadOutput, VhsFilenames, clamp_expires, env_var,
    file_payload, image_payload, pick_vhs_path,
};
use crate::tensor::Tensor;

/// 上传并返回URL：需要签名时生成签名URL，否则为公开URL
fn put_and_link(
    store: &dyn ObjectStore,
    key: &str,
    bytes: &[u8],
    mime: &str,
    signed_expires: Option<u64>,
) -> Result<String, CloudError> {
    store.prepare()?;
    store.put_object(key, bytes, mime)?;
    let url = match signed_expires {
        Some(expires) => store.signed_url(key, clamp_expires(expires))?,
        None => store.public_url(key),
    };
    tracing::info!(provider = %store.provider(), key, size = bytes.len(), "上传完成");
    Ok(url)
}

/// 视频来源：优先取视频合成输出中的路径，否则用`file_path`。
/// 节点在解析凭据之前先确认该文件存在
fn video_source(file_path: &str, vhs_filenames: Option<&VhsFilenames>, prefer_index: i64) -> PathBuf {
    vhs_filenames
        .and_then(|filenames| pick_vhs_path(filenames, prefer_index))
        .unwrap_or_else(|| PathBuf::from(file_path.trim()))
}

fn s3_store(bucket: &str, region: &str, endpoint: &str) -> Result<S3Store, CloudError> {
    let mut config = S3Config::from_env(bucket)?.with_region(region);
    if !endpoint.trim().is_empty() {
        config = config.with_endpoint(endpoint);
    }
    S3Store::connect(config)
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓S3↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3ImageInput {
    pub bucket: String,
    pub key_template: String,
    pub region: String,
    /// 兼容S3的自定义端点，空字符串表示AWS
    pub endpoint: String,
    pub mime: String,
    pub use_signed_url: bool,
    pub callback_url: String,
}

impl Default for S3ImageInput {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key_template: "comfy/{timestamp}.png".to_string(),
            region: String::new(),
            endpoint: String::new(),
            mime: "image/png".to_string(),
            use_signed_url: false,
            callback_url: String::new(),
        }
    }
}

/// 将IMAGE张量以PNG上传到S3，原样传出图像
#[derive(Debug, Clone, Default)]
pub struct S3ImageNode {
    notifier: Notifier,
}

impl S3ImageNode {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub fn upload(&self, image: &Tensor, input: &S3ImageInput) -> Result<(Tensor, UploadOutput), CloudError> {
        let store = s3_store(&input.bucket, &input.region, &input.endpoint)?;
        self.upload_to(&store, image, input)
    }

    pub fn upload_to(
        &self,
        store: &dyn ObjectStore,
        image: &Tensor,
        input: &S3ImageInput,
    ) -> Result<(Tensor, UploadOutput), CloudError> {
        let key = KeyTemplate::new(input.key_template.as_str()).render_now("");
        let bytes = image_payload(image)?;
        let url = put_and_link(
            store,
            &key,
            &bytes,
            &input.mime,
            input.use_signed_url.then_some(DEFAULT_SIGNED_EXPIRES),
        )?;
        let payload = CallbackPayload::new(&url, store.provider()).with_path(&key);
        let delivery = self.notifier.notify(&input.callback_url, &payload);
        Ok((
            image.clone(),
            UploadOutput {
                url,
                key,
                size_bytes: bytes.len(),
                delivery,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3VideoInput {
    pub file_path: String,
    pub bucket: String,
    pub key_template: String,
    pub region: String,
    pub endpoint: String,
    pub mime: String,
    pub use_signed_url: bool,
    pub signed_expires: u64,
    pub callback_url: String,
    pub vhs_filenames: Option<VhsFilenames>,
    /// -1为最后一个文件（通常是最终视频）
    pub prefer_index: i64,
}

impl Default for S3VideoInput {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            bucket: String::new(),
            key_template: "comfyui/videos/{basename}".to_string(),
            region: String::new(),
            endpoint: String::new(),
            mime: "video/mp4".to_string(),
            use_signed_url: false,
            signed_expires: DEFAULT_SIGNED_EXPIRES,
            callback_url: String::new(),
            vhs_filenames: None,
            prefer_index: -1,
        }
    }
}

/// 将本地文件（通常是mp4）上传到S3
#[derive(Debug, Clone, Default)]
pub struct S3VideoNode {
    notifier: Notifier,
}

impl S3VideoNode {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub fn upload(&self, input: &S3VideoInput) -> Result<UploadOutput, CloudError> {
        let source = video_source(&input.file_path, input.vhs_filenames.as_ref(), input.prefer_index);
        if !source.is_file() {
            return Err(CloudError::FileNotFound(source));
        }
        let store = s3_store(&input.bucket, &input.region, &input.endpoint)?;
        self.upload_to(&store, input)
    }

    pub fn upload_to(&self, store: &dyn ObjectStore, input: &S3VideoInput) -> Result<UploadOutput, CloudError> {
        let source = video_source(&input.file_path, input.vhs_filenames.as_ref(), input.prefer_index);
        let file = file_payload(&source)?;
        let key = KeyTemplate::new(input.key_template.as_str()).render_now(&file.basename);
        let url = put_and_link(
            store,
            &key,
            &file.bytes,
            &input.mime,
            input.use_signed_url.then_some(input.signed_expires),
        )?;
        let payload = CallbackPayload::new(&url, store.provider())
            .with_mime(&input.mime)
            .with_size(file.bytes.len());
        let delivery = self.notifier.notify(&input.callback_url, &payload);
        Ok(UploadOutput {
            url,
            key,
            size_bytes: file.bytes.len(),
            delivery,
        })
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑S3↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓Azure↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureImageInput {
    pub container_name: String,
    pub blob_name_template: String,
    /// 连接字符串，或账户名+密钥；都留空时取环境变量
    pub connection_string: String,
    pub account_name: String,
    pub account_key: String,
    pub mime: String,
    pub use_signed_url: bool,
    pub signed_expires: u64,
    pub callback_url: String,
}

impl AzureImageInput {
    pub const DEFAULT_CONTAINER: &'static str = "images";
}

impl Default for AzureImageInput {
    fn default() -> Self {
        Self {
            container_name: Self::DEFAULT_CONTAINER.to_string(),
            blob_name_template: "comfyui/images/{timestamp}.png".to_string(),
            connection_string: String::new(),
            account_name: String::new(),
            account_key: String::new(),
            mime: "image/png".to_string(),
            use_signed_url: false,
            signed_expires: DEFAULT_SIGNED_EXPIRES,
            callback_url: String::new(),
        }
    }
}

/// 将IMAGE张量以PNG上传到Azure Blob，原样传出图像
#[derive(Debug, Clone, Default)]
pub struct AzureImageNode {
    notifier: Notifier,
}

impl AzureImageNode {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub fn store(input: &AzureImageInput) -> Result<AzureBlobStore, CloudError> {
        let config = AzureConfig::resolve(&input.connection_string, &input.account_name, &input.account_key)?;
        let container = match input.container_name.trim() {
            "" => AzureImageInput::DEFAULT_CONTAINER,
            container => container,
        };
        AzureBlobStore::new(config, container)
    }

    pub fn upload(&self, image: &Tensor, input: &AzureImageInput) -> Result<(Tensor, UploadOutput), CloudError> {
        let store = Self::store(input)?;
        self.upload_to(&store, image, input)
    }

    pub fn upload_to(
        &self,
        store: &dyn ObjectStore,
        image: &Tensor,
        input: &AzureImageInput,
    ) -> Result<(Tensor, UploadOutput), CloudError> {
        let bytes = image_payload(image)?;
        let blob = KeyTemplate::new(input.blob_name_template.as_str()).render_now("");
        let url = put_and_link(
            store,
            &blob,
            &bytes,
            &input.mime,
            input.use_signed_url.then_some(input.signed_expires),
        )?;
        let payload = CallbackPayload::new(&url, store.provider())
            .with_path(&blob)
            .with_mime(&input.mime)
            .with_size(bytes.len());
        let delivery = self.notifier.notify(&input.callback_url, &payload);
        Ok((
            image.clone(),
            UploadOutput {
                url,
                key: blob,
                size_bytes: bytes.len(),
                delivery,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureVideoInput {
    pub file_path: String,
    pub container_name: String,
    pub blob_name_template: String,
    pub connection_string: String,
    pub account_name: String,
    pub account_key: String,
    pub mime: String,
    pub use_signed_url: bool,
    pub signed_expires: u64,
    pub callback_url: String,
    pub vhs_filenames: Option<VhsFilenames>,
    pub prefer_index: i64,
}

impl AzureVideoInput {
    pub const DEFAULT_BLOB_TEMPLATE: &'static str = "comfyui/videos/{basename}";

    /// `AZURE_BLOB_CONTAINER_VIDEOS`，默认`videos`
    pub fn default_container() -> String {
        env_var(VIDEO_CONTAINER_ENV).unwrap_or_else(|| "videos".to_string())
    }
}

impl Default for AzureVideoInput {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            container_name: Self::default_container(),
            blob_name_template: Self::DEFAULT_BLOB_TEMPLATE.to_string(),
            connection_string: String::new(),
            account_name: String::new(),
            account_key: String::new(),
            mime: "video/mp4".to_string(),
            use_signed_url: false,
            signed_expires: DEFAULT_SIGNED_EXPIRES,
            callback_url: String::new(),
            vhs_filenames: None,
            prefer_index: -1,
        }
    }
}

/// 将本地文件（通常是mp4）上传到Azure Blob
#[derive(Debug, Clone, Default)]
pub struct AzureVideoNode {
    notifier: Notifier,
}

impl AzureVideoNode {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    pub fn store(input: &AzureVideoInput) -> Result<AzureBlobStore, CloudError> {
        let config = AzureConfig::resolve(&input.connection_string, &input.account_name, &input.account_key)?;
        let container = match input.container_name.trim() {
            "" => AzureVideoInput::default_container(),
            container => container.to_string(),
        };
        AzureBlobStore::new(config, &container)
    }

    pub fn upload(&self, input: &AzureVideoInput) -> Result<UploadOutput, CloudError> {
        let source = video_source(&input.file_path, input.vhs_filenames.as_ref(), input.prefer_index);
        if !source.is_file() {
            return Err(CloudError::FileNotFound(source));
        }
        let store = Self::store(input)?;
        self.upload_to(&store, input)
    }

    pub fn upload_to(&self, store: &dyn ObjectStore, input: &AzureVideoInput) -> Result<UploadOutput, CloudError> {
        let source = video_source(&input.file_path, input.vhs_filenames.as_ref(), input.prefer_index);
        let file = file_payload(&source)?;
        let template = match input.blob_name_template.trim() {
            "" => AzureVideoInput::DEFAULT_BLOB_TEMPLATE,
            template => template,
        };
        let blob = KeyTemplate::new(template).render_now(&file.basename);
        let url = put_and_link(
            store,
            &blob,
            &file.bytes,
            &input.mime,
            input.use_signed_url.then_some(input.signed_expires),
        )?;
        let payload = CallbackPayload::new(&url, store.provider())
            .with_mime(&input.mime)
            .with_size(file.bytes.len());
        let delivery = self.notifier.notify(&input.callback_url, &payload);
        Ok(UploadOutput {
            url,
            key: blob,
            size_bytes: file.bytes.len(),
            delivery,
        })
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑Azure↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
