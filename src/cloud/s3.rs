//! S3（及兼容S3的服务）对象上传
//!
//! 凭据与区域走AWS SDK的默认提供链：环境变量、共享配置文件（`AWS_PROFILE`）、SSO、
//! Web Identity、容器/实例角色；区域都找不到时用`us-east-1`。
//! 默认使用虚拟主机风格`https://{bucket}.s3.{region}.amazonaws.com/{key}`；
//! 指定自定义端点时改用路径风格`{endpoint}/{bucket}/{key}`。

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::RequestChecksumCalculation;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;

use super::signing::encode_path;
use super::{CloudError, ObjectStore, Provider, env_var};

pub const ENDPOINT_ENV: &str = "AWS_ENDPOINT_URL";
pub const DEFAULT_REGION: &str = "us-east-1";

/// 显式凭据的来源名，出现在SDK的日志里
const STATIC_PROVIDER_NAME: &str = "jl_nodes";

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// 为None时走默认提供链
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// 为None时走默认提供链
    pub credentials: Option<Credentials>,
}

impl S3Config {
    pub fn new(bucket: &str) -> Result<Self, CloudError> {
        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(CloudError::InvalidInput("bucket不能为空".to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            region: None,
            endpoint: None,
            credentials: None,
        })
    }

    /// 自定义端点取自`AWS_ENDPOINT_URL`（若有）
    pub fn from_env(bucket: &str) -> Result<Self, CloudError> {
        let config = Self::new(bucket)?;
        Ok(match env_var(ENDPOINT_ENV) {
            Some(endpoint) => config.with_endpoint(&endpoint),
            None => config,
        })
    }

    /// 空字符串表示交给默认提供链
    pub fn with_region(mut self, region: &str) -> Self {
        let region = region.trim();
        self.region = (!region.is_empty()).then(|| region.to_string());
        self
    }

    /// 自定义端点（如`http://127.0.0.1:9000`），空字符串表示使用AWS默认端点
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        let endpoint = endpoint.trim().trim_end_matches('/');
        self.endpoint = (!endpoint.is_empty()).then(|| endpoint.to_string());
        self
    }

    /// 显式的访问密钥，不再查找默认提供链；缺任何一项即报错
    pub fn with_static_credentials(
        mut self,
        access_key_id: &str,
        secret_access_key: &str,
        session_token: Option<String>,
    ) -> Result<Self, CloudError> {
        let (access_key_id, secret_access_key) = (access_key_id.trim(), secret_access_key.trim());
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(CloudError::MissingCredentials(
                "显式凭据需要同时给出access key id与secret access key".to_string(),
            ));
        }
        self.credentials = Some(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_PROVIDER_NAME,
        ));
        Ok(self)
    }
}

/// 向提供链取一次凭据，取不到即为`MissingCredentials`
pub async fn resolve_credentials(provider: &SharedCredentialsProvider) -> Result<Credentials, CloudError> {
    provider
        .provide_credentials()
        .await
        .map_err(|e| CloudError::MissingCredentials(DisplayErrorContext(&e).to_string()))
}

/// 有响应的错误带上状态码，其余（连接、超时、构造请求）视为传输错误
fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> CloudError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match err.raw_response() {
        Some(response) => CloudError::Http {
            status: response.status().as_u16(),
            body: message,
        },
        None => CloudError::Transport(message),
    }
}

async fn load_client(config: &S3Config) -> Result<(Client, String), CloudError> {
    let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .retry_config(RetryConfig::disabled());
    if let Some(credentials) = &config.credentials {
        loader = loader.credentials_provider(credentials.clone());
    }
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint.as_str());
    }
    let sdk_config = loader.load().await;

    let provider = sdk_config
        .credentials_provider()
        .ok_or_else(|| CloudError::MissingCredentials("没有可用的AWS凭据提供链".to_string()))?;
    resolve_credentials(&provider).await?;

    let region = sdk_config
        .region()
        .map_or_else(|| DEFAULT_REGION.to_string(), ToString::to_string);
    // 兼容S3的服务多数不认新的校验和头
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.endpoint.is_some())
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .build();
    Ok((Client::from_conf(s3_config), region))
}

#[derive(Debug, Clone)]
pub struct S3Store {
    config: S3Config,
    region: String,
    client: Client,
    runtime: Arc<Runtime>,
}

impl S3Store {
    /// 解析凭据与区域并建立客户端。凭据在此处即取一次，缺失时立即报错
    pub fn connect(config: S3Config) -> Result<Self, CloudError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (client, region) = runtime.block_on(load_client(&config))?;
        tracing::debug!(bucket = %config.bucket, region = %region, endpoint = ?config.endpoint, "S3客户端已就绪");
        Ok(Self {
            config,
            region,
            client,
            runtime: Arc::new(runtime),
        })
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// 实际使用的区域
    pub fn region(&self) -> &str {
        &self.region
    }

    /// 实际请求的对象地址
    pub fn object_url(&self, key: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!("{endpoint}/{}/{}", self.config.bucket, encode_path(key)),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket,
                self.region,
                encode_path(key)
            ),
        }
    }

    /// 从`start`起`expires`秒内有效的GET预签名URL
    pub fn presigned_url_at(&self, key: &str, expires: u64, start: SystemTime) -> Result<String, CloudError> {
        let presigning = PresigningConfig::builder()
            .start_time(start)
            .expires_in(Duration::from_secs(expires))
            .build()
            .map_err(|e| CloudError::Signing(e.to_string()))?;
        let request = self
            .runtime
            .block_on(
                self.client
                    .get_object()
                    .bucket(&self.config.bucket)
                    .key(key)
                    .presigned(presigning),
            )
            .map_err(sdk_error)?;
        Ok(request.uri().to_string())
    }
}

impl ObjectStore for S3Store {
    fn provider(&self) -> Provider {
        Provider::S3
    }

    fn put_object(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), CloudError> {
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.config.bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(ByteStream::from(bytes.to_vec()))
                    .send(),
            )
            .map_err(sdk_error)?;
        tracing::debug!(bucket = %self.config.bucket, key, size = bytes.len(), "S3 PUT 完成");
        Ok(())
    }

    /// AWS默认端点下沿用`https://{bucket}/{key}`（以bucket名作域名）；自定义端点则为对象地址
    fn public_url(&self, key: &str) -> String {
        match &self.config.endpoint {
            Some(_) => self.object_url(key),
            None => format!("https://{}/{key}", self.config.bucket),
        }
    }

    fn signed_url(&self, key: &str, expires: u64) -> Result<String, CloudError> {
        self.presigned_url_at(key, expires, SystemTime::now())
    }
}
