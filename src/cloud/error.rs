//! 云存储上传错误类型定义

use std::path::PathBuf;
use thiserror::Error;

use crate::errors::TensorError;

#[derive(Debug, Error)]
pub enum CloudError {
    /// 凭据缺失（字段与环境变量都没有提供）
    #[error("缺少凭据: {0}")]
    MissingCredentials(String),

    /// 待上传的文件未找到
    #[error("文件未找到: {0}")]
    FileNotFound(PathBuf),

    /// 必填的输入为空或不合法
    #[error("无效的输入: {0}")]
    InvalidInput(String),

    #[error("无效的连接字符串: {0}")]
    InvalidConnectionString(String),

    /// 服务端返回了非2xx状态码
    #[error("HTTP 状态码 {status}: {body}")]
    Http { status: u16, body: String },

    /// 连接、超时等传输层错误
    #[error("HTTP 请求失败: {0}")]
    Transport(String),

    #[error("签名失败: {0}")]
    Signing(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ureq::Error> for CloudError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(status, response) => CloudError::Http {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => CloudError::Transport(transport.to_string()),
        }
    }
}
