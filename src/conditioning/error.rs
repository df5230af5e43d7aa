//! 条件数据存取错误类型定义

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum ConditioningError {
    /// 文件未找到
    #[error("文件未找到: {0}")]
    FileNotFound(PathBuf),

    /// 文件名为空、含路径分隔符或`..`
    #[error("无效的文件名: {0:?}")]
    InvalidFilename(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 文件不是合法的JSON，或顶层不是数组
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("格式错误: {0}")]
    FormatError(String),

    /// 某一条目解码失败，整个加载随之中止
    #[error("第{index}条条目无效: {source}")]
    Entry {
        index: usize,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}
