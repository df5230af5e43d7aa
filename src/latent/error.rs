//! 潜空间张量存取错误类型定义

use std::path::PathBuf;
use thiserror::Error;

use crate::errors::TensorError;

#[derive(Debug, Error)]
pub enum LatentError {
    #[error("未选择潜空间文件")]
    NoFileSelected,

    /// 文件未找到
    #[error("潜空间文件未找到: {0}")]
    FileNotFound(PathBuf),

    /// 路径为绝对路径或含`..`，会逃出输出目录
    #[error("无效的路径: {0:?}")]
    InvalidPath(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 检查点头部或数据区不合法
    #[error("检查点格式错误: {0}")]
    InvalidCheckpoint(String),

    /// 检查点中没有潜空间张量
    #[error("检查点中没有潜空间张量（需要键{0}）")]
    MissingKey(String),

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}
