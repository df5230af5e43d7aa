//! Azure Blob上传：连接字符串解析、SharedKey签名、服务SAS
//!
//! 凭据优先级：连接字符串（字段，其次环境变量`AZURE_STORAGE_CONNECTION_STRING`），
//! 然后是账户名+密钥（字段，其次`AZURE_STORAGE_ACCOUNT`与`AZURE_STORAGE_KEY`）。

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};

use super::signing::{encode_path, hmac_sha256, uri_encode};
use super::{CloudError, ObjectStore, Provider, env_var};

pub const CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const ACCOUNT_ENV: &str = "AZURE_STORAGE_ACCOUNT";
pub const KEY_ENV: &str = "AZURE_STORAGE_KEY";
pub const VIDEO_CONTAINER_ENV: &str = "AZURE_BLOB_CONTAINER_VIDEOS";
/// 请求头`x-ms-version`与SAS的`sv`
pub const API_VERSION: &str = "2022-11-02";
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
const SAS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// `Key=Value;...`形式的存储账户连接字符串
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub blob_endpoint: Option<String>,
    pub protocol: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub shared_access_signature: Option<String>,
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "***"))
            .field("blob_endpoint", &self.blob_endpoint)
            .field("protocol", &self.protocol)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("shared_access_signature", &self.shared_access_signature.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ConnectionString {
    pub fn parse(input: &str) -> Result<Self, CloudError> {
        let mut parsed = ConnectionString::default();
        for part in input.split(';').map(str::trim).filter(|part| !part.is_empty()) {
            // 密钥本身可能含`=`，只按第一个`=`拆分
            let (key, value) = part.split_once('=').ok_or_else(|| {
                CloudError::InvalidConnectionString("存在缺少`=`的片段".to_string())
            })?;
            let value = Some(value.trim().to_string());
            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => parsed.account_name = value,
                "accountkey" => parsed.account_key = value,
                "blobendpoint" => parsed.blob_endpoint = value,
                "defaultendpointsprotocol" => parsed.protocol = value,
                "endpointsuffix" => parsed.endpoint_suffix = value,
                "sharedaccesssignature" => parsed.shared_access_signature = value,
                _ => {}
            }
        }
        if parsed.account_key.is_none() && parsed.shared_access_signature.is_none() {
            return Err(CloudError::InvalidConnectionString(
                "需要AccountKey或SharedAccessSignature".to_string(),
            ));
        }
        if parsed.account_name.is_none() && parsed.blob_endpoint.is_none() {
            return Err(CloudError::InvalidConnectionString(
                "需要AccountName或BlobEndpoint".to_string(),
            ));
        }
        Ok(parsed)
    }

    /// Blob服务地址：显式的`BlobEndpoint`，否则`{protocol}://{account}.blob.{suffix}`
    pub fn blob_endpoint(&self) -> String {
        if let Some(endpoint) = &self.blob_endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        format!(
            "{}://{}.blob.{}",
            self.protocol.as_deref().unwrap_or("https"),
            self.account_name.as_deref().unwrap_or_default(),
            self.endpoint_suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
        )
    }

    /// 账户名；连接字符串未给出时取端点主机名的第一段
    pub fn account_name(&self) -> String {
        if let Some(account) = &self.account_name {
            return account.clone();
        }
        let endpoint = self.blob_endpoint();
        let host = endpoint.split_once("://").map_or(endpoint.as_str(), |(_, rest)| rest);
        host.split(['.', '/', ':']).next().unwrap_or_default().to_string()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum AzureAuth {
    /// base64编码的账户密钥
    SharedKey(String),
    /// SAS令牌（不含开头的`?`）
    Sas(String),
}

impl fmt::Debug for AzureAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AzureAuth::SharedKey(_) => f.write_str("SharedKey(***)"),
            AzureAuth::Sas(_) => f.write_str("Sas(***)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub endpoint: String,
    pub account_name: String,
    pub auth: AzureAuth,
}

impl AzureConfig {
    pub fn from_connection_string(input: &str) -> Result<Self, CloudError> {
        let parsed = ConnectionString::parse(input)?;
        let auth = match (&parsed.account_key, &parsed.shared_access_signature) {
            (Some(key), _) => AzureAuth::SharedKey(key.clone()),
            (None, Some(sas)) => AzureAuth::Sas(sas.trim_start_matches('?').to_string()),
            (None, None) => {
                return Err(CloudError::InvalidConnectionString(
                    "需要AccountKey或SharedAccessSignature".to_string(),
                ));
            }
        };
        Ok(Self {
            endpoint: parsed.blob_endpoint(),
            account_name: parsed.account_name(),
            auth,
        })
    }

    pub fn from_account(account_name: &str, account_key: &str) -> Self {
        Self {
            endpoint: format!("https://{account_name}.blob.{DEFAULT_ENDPOINT_SUFFIX}"),
            account_name: account_name.to_string(),
            auth: AzureAuth::SharedKey(account_key.to_string()),
        }
    }

    /// 按优先级解析凭据，参数为节点字段（可为空字符串）
    pub fn resolve(
        connection_string: &str,
        account_name: &str,
        account_key: &str,
    ) -> Result<Self, CloudError> {
        let connection_string = non_empty(connection_string).or_else(|| env_var(CONNECTION_STRING_ENV));
        if let Some(connection_string) = connection_string {
            return Self::from_connection_string(&connection_string);
        }
        let account = non_empty(account_name).or_else(|| env_var(ACCOUNT_ENV));
        let key = non_empty(account_key).or_else(|| env_var(KEY_ENV));
        match (account, key) {
            (Some(account), Some(key)) => Ok(Self::from_account(&account, &key)),
            _ => Err(CloudError::MissingCredentials(format!(
                "需要连接字符串，或账户名+密钥（也可通过{CONNECTION_STRING_ENV}、{ACCOUNT_ENV}与{KEY_ENV}设置）"
            ))),
        }
    }

    /// 替换服务地址（如本地模拟器）
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn account_key(&self) -> Option<&str> {
        match &self.auth {
            AzureAuth::SharedKey(key) => Some(key),
            AzureAuth::Sas(_) => None,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn decode_key(account_key: &str) -> Result<Vec<u8>, CloudError> {
    STANDARD
        .decode(account_key.trim())
        .map_err(|e| CloudError::InvalidInput(format!("账户密钥不是合法的base64: {e}")))
}

/// URL中主机之后的路径部分（含开头的`/`）
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.find('/').map_or("", |index| &rest[index..]);
    path.split('?').next().unwrap_or_default()
}

/// SharedKey签名的待签字符串（Blob服务，2015-02-21及之后版本，长度为0时留空）
pub fn shared_key_string_to_sign(
    method: &str,
    content_length: usize,
    content_type: &str,
    ms_headers: &BTreeMap<String, String>,
    account_name: &str,
    path: &str,
    query: &BTreeMap<String, String>,
) -> String {
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };
    let canonical_headers = ms_headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect::<String>();
    let mut resource = format!("/{account_name}{path}");
    for (name, value) in query {
        resource.push_str(&format!("\n{name}:{value}"));
    }
    format!("{method}\n\n\n{content_length}\n\n{content_type}\n\n\n\n\n\n\n{canonical_headers}{resource}")
}

/// 服务SAS（Blob资源、只读）的待签字符串
pub fn sas_string_to_sign(account_name: &str, container: &str, blob: &str, expiry: &str) -> String {
    let resource = format!("/blob/{account_name}/{container}/{blob}");
    [
        "r", "", expiry, &resource, "", "", "", API_VERSION, "b", "", "", "", "", "", "", "",
    ]
    .join("\n")
}

#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    config: AzureConfig,
    container: String,
    agent: ureq::Agent,
}

impl AzureBlobStore {
    pub fn new(config: AzureConfig, container: &str) -> Result<Self, CloudError> {
        let container = container.trim();
        if container.is_empty() {
            return Err(CloudError::InvalidInput("容器名不能为空".to_string()));
        }
        Ok(Self {
            config,
            container: container.to_string(),
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn container_url(&self) -> String {
        format!("{}/{}", self.config.endpoint, self.container)
    }

    pub fn blob_url(&self, blob: &str) -> String {
        format!("{}/{}", self.container_url(), encode_path(blob))
    }

    /// 发送一个带鉴权的PUT请求
    fn put(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
        extra_headers: &BTreeMap<String, String>,
        bytes: &[u8],
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ureq::Response, CloudError> {
        let mut ms_headers = extra_headers.clone();
        ms_headers.insert("x-ms-date".to_string(), now.format(RFC1123_FORMAT).to_string());
        ms_headers.insert("x-ms-version".to_string(), API_VERSION.to_string());

        let mut full_url = url.to_string();
        let mut params = query
            .iter()
            .map(|(name, value)| format!("{name}={}", uri_encode(value, true)))
            .collect::<Vec<_>>();
        let authorization = match &self.config.auth {
            AzureAuth::SharedKey(key) => {
                let string_to_sign = shared_key_string_to_sign(
                    "PUT",
                    bytes.len(),
                    content_type,
                    &ms_headers,
                    &self.config.account_name,
                    url_path(url),
                    query,
                );
                let signature = hmac_sha256(&decode_key(key)?, string_to_sign.as_bytes())?;
                Some(format!(
                    "SharedKey {}:{}",
                    self.config.account_name,
                    STANDARD.encode(signature)
                ))
            }
            AzureAuth::Sas(token) => {
                params.push(token.clone());
                None
            }
        };
        if !params.is_empty() {
            full_url = format!("{full_url}?{}", params.join("&"));
        }

        let mut request = self.agent.put(&full_url);
        if let Some(authorization) = &authorization {
            request = request.set("Authorization", authorization);
        }
        if !content_type.is_empty() {
            request = request.set("Content-Type", content_type);
        }
        for (name, value) in &ms_headers {
            request = request.set(name, value);
        }
        Ok(request.send_bytes(bytes)?)
    }

    /// 创建容器。已存在（409）时返回`Ok(false)`
    pub fn create_container_at(&self, now: DateTime<Utc>) -> Result<bool, CloudError> {
        let query = BTreeMap::from([("restype".to_string(), "container".to_string())]);
        match self.put(&self.container_url(), &query, &BTreeMap::new(), &[], "", now) {
            Ok(_) => {
                tracing::info!(container = %self.container, "已创建容器");
                Ok(true)
            }
            Err(CloudError::Http { status: 409, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn create_container(&self) -> Result<bool, CloudError> {
        self.create_container_at(Utc::now())
    }

    pub fn put_blob_at(
        &self,
        blob: &str,
        bytes: &[u8],
        content_type: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CloudError> {
        let headers = BTreeMap::from([("x-ms-blob-type".to_string(), "BlockBlob".to_string())]);
        self.put(&self.blob_url(blob), &BTreeMap::new(), &headers, bytes, content_type, now)?;
        tracing::debug!(container = %self.container, blob, size = bytes.len(), "Azure PUT 完成");
        Ok(())
    }

    /// 只读的服务SAS查询串。账户密钥取自配置，其次环境变量`AZURE_STORAGE_KEY`
    pub fn sas_query_at(
        &self,
        blob: &str,
        expires: u64,
        now: DateTime<Utc>,
    ) -> Result<String, CloudError> {
        let key = self
            .config
            .account_key()
            .map(str::to_string)
            .or_else(|| env_var(KEY_ENV))
            .ok_or_else(|| {
                CloudError::MissingCredentials(format!("生成SAS需要账户密钥（{KEY_ENV}）"))
            })?;
        let expiry = (now + Duration::seconds(expires as i64))
            .format(SAS_TIME_FORMAT)
            .to_string();
        let string_to_sign =
            sas_string_to_sign(&self.config.account_name, &self.container, blob, &expiry);
        let signature = STANDARD.encode(hmac_sha256(&decode_key(&key)?, string_to_sign.as_bytes())?);
        Ok(format!(
            "se={}&sp=r&sv={API_VERSION}&sr=b&sig={}",
            uri_encode(&expiry, true),
            uri_encode(&signature, true)
        ))
    }
}

impl ObjectStore for AzureBlobStore {
    fn provider(&self) -> Provider {
        Provider::Azure
    }

    /// 确保容器存在。创建失败（如SAS令牌无权创建容器）只记录警告，随后的上传会给出真正的错误
    fn prepare(&self) -> Result<(), CloudError> {
        if let Err(e) = self.create_container() {
            tracing::warn!(container = %self.container, error = %e, "创建容器失败，继续尝试上传");
        }
        Ok(())
    }

    fn put_object(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), CloudError> {
        self.put_blob_at(key, bytes, content_type, Utc::now())
    }

    fn public_url(&self, key: &str) -> String {
        self.blob_url(key)
    }

    fn signed_url(&self, key: &str, expires: u64) -> Result<String, CloudError> {
        let sas = self.sas_query_at(key, expires, Utc::now())?;
        Ok(format!("{}?{sas}", self.blob_url(key)))
    }
}
