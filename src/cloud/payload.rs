//! 上传内容的准备：图像张量编码为PNG，或读取本地文件

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::CloudError;
use crate::tensor::Tensor;

/// IMAGE张量批次中第0张图像的PNG编码
pub fn image_payload(image: &Tensor) -> Result<Vec<u8>, CloudError> {
    Ok(image.to_png_bytes(0)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub path: PathBuf,
    pub basename: String,
    pub bytes: Vec<u8>,
}

/// 读取本地文件。文件不存在时报错，不会上传空内容
pub fn file_payload(path: &Path) -> Result<FilePayload, CloudError> {
    if !path.is_file() {
        return Err(CloudError::FileNotFound(path.to_path_buf()));
    }
    let basename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = std::fs::read(path)?;
    Ok(FilePayload {
        path: path.to_path_buf(),
        basename,
        bytes,
    })
}

/// 视频合成节点的输出：`[是否保存, [路径...]]`，通常最后一个路径是最终视频
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VhsFilenames {
    pub save_output: bool,
    pub paths: Vec<PathBuf>,
}

impl VhsFilenames {
    pub fn new(save_output: bool, paths: Vec<PathBuf>) -> Self {
        Self { save_output, paths }
    }
}

/// 取`paths[index]`，负数从末尾计起（-1为最后一个）；越界返回None
pub fn pick_vhs_path(filenames: &VhsFilenames, index: i64) -> Option<PathBuf> {
    let len = filenames.paths.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    if !(0..len).contains(&resolved) {
        tracing::warn!(index, len, "无法从视频合成输出中取出路径");
        return None;
    }
    filenames.paths.get(resolved as usize).cloned()
}
