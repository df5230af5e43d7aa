//! # 云存储上传节点
//!
//! 将IMAGE张量（编码为PNG）或本地视频文件上传到S3或Azure Blob，
//! 返回公开URL或带时效的签名URL，并可选地向回调地址POST一条通知。
//!
//! 上传本身失败即报错；回调失败只记录日志，结果见[`Delivery`]。

mod azure;
mod error;
mod nodes;
mod notify;
mod payload;
mod s3;
mod signing;
mod template;

pub use self::azure::{
    API_VERSION, AzureAuth, AzureBlobStore, AzureConfig, ConnectionString, VIDEO_CONTAINER_ENV,
    sas_string_to_sign, shared_key_string_to_sign,
};
pub use self::error::CloudError;
pub use self::nodes::{
    AzureImageInput, AzureImageNode, AzureVideoInput, AzureVideoNode, S3ImageInput, S3ImageNode,
    S3VideoInput, S3VideoNode,
};
pub use self::notify::{CALLBACK_TIMEOUT, CallbackPayload, Delivery, Notifier};
pub use self::payload::{FilePayload, VhsFilenames, file_payload, image_payload, pick_vhs_path};
pub use self::s3::{DEFAULT_REGION, ENDPOINT_ENV, S3Config, S3Store, resolve_credentials};
pub use self::signing::{encode_path, hmac_sha256, uri_encode};
pub use self::template::KeyTemplate;

use serde::Serialize;

#[cfg(test)]
mod tests;

/// 签名URL的默认有效期（秒）
pub const DEFAULT_SIGNED_EXPIRES: u64 = 3600;
pub const MIN_SIGNED_EXPIRES: u64 = 60;
/// 7天，S3预签名URL的上限
pub const MAX_SIGNED_EXPIRES: u64 = 604_800;

/// 有效期限制在`60..=604800`秒；0表示使用默认值
pub fn clamp_expires(expires: u64) -> u64 {
    if expires == 0 {
        return DEFAULT_SIGNED_EXPIRES;
    }
    let clamped = expires.clamp(MIN_SIGNED_EXPIRES, MAX_SIGNED_EXPIRES);
    if clamped != expires {
        tracing::debug!(expires, clamped, "签名URL有效期超出范围，已截断");
    }
    clamped
}

/// 非空的环境变量值（两端空白已去除）
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    S3,
    Azure,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::S3 => "s3",
            Provider::Azure => "azure",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对象存储的最小接口：上传节点只依赖它
pub trait ObjectStore {
    fn provider(&self) -> Provider;

    /// 上传前的准备（如创建容器），默认无事可做
    fn prepare(&self) -> Result<(), CloudError> {
        Ok(())
    }

    fn put_object(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), CloudError>;

    /// 对象可公开访问时的URL
    fn public_url(&self, key: &str) -> String;

    /// 带时效的只读签名URL，`expires`单位为秒
    fn signed_url(&self, key: &str, expires: u64) -> Result<String, CloudError>;
}

/// 上传节点的输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutput {
    pub url: String,
    pub key: String,
    pub size_bytes: usize,
    pub delivery: Delivery,
}
