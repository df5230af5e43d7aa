use thiserror::Error;

use super::MAX_DEPTH;
use crate::errors::TensorError;

/// 张量/元数据JSON编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    /// `type`字段不在{tensor, value, list, dict}之内
    #[error("未知的类型标签：{0}")]
    UnknownTag(String),

    #[error("信封格式错误：{0}")]
    MalformedEnvelope(String),

    #[error("嵌套层数超过上限{}", MAX_DEPTH)]
    DepthExceeded,

    /// 如NaN、±inf等无法用JSON原生表示的标量
    #[error("无法用JSON原生表示的标量：{0}")]
    NonJsonScalar(String),

    #[error("base64解码失败：{0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("JSON错误：{0}")]
    Json(#[from] serde_json::Error),
}
