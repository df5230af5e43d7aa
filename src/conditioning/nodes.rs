use std::path::PathBuf;

use super::{Conditioning, ConditioningEntry, ConditioningError, load_json, save_json};
use crate::catalog::scan_files;
use crate::paths::FolderPaths;

/// 条件数据文件的扩展名
pub const JSON_EXTENSION: &str = "json";

/// 文件名只能是单个路径段
fn checked_filename(filename: &str) -> Result<&str, ConditioningError> {
    let trimmed = filename.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\']);
    if invalid {
        return Err(ConditioningError::InvalidFilename(filename.to_string()));
    }
    Ok(trimmed)
}

/// 保存条件数据（JSON）节点：写入`<输出目录>/conditioning/<文件名>`
#[derive(Debug, Clone)]
pub struct ConditioningSaveJson {
    paths: FolderPaths,
}

impl ConditioningSaveJson {
    pub const DEFAULT_FILENAME: &'static str = "conditioning.json";

    pub fn new(paths: FolderPaths) -> Self {
        Self { paths }
    }

    pub fn save(
        &self,
        conditioning: &[ConditioningEntry],
        filename: &str,
    ) -> Result<PathBuf, ConditioningError> {
        let filename = checked_filename(filename)?;
        save_json(conditioning, &self.paths.conditioning_dir().join(filename))
    }
}

/// 加载条件数据（JSON）节点
#[derive(Debug, Clone)]
pub struct ConditioningLoadJson {
    paths: FolderPaths,
}

impl ConditioningLoadJson {
    pub fn new(paths: FolderPaths) -> Self {
        Self { paths }
    }

    /// 可供选择的文件：条件数据目录下的`.json`文件（不递归）
    pub fn options(&self) -> Vec<String> {
        scan_files(&self.paths.conditioning_dir(), &[JSON_EXTENSION], false)
    }

    pub fn load(&self, filename: &str) -> Result<Conditioning, ConditioningError> {
        let filename = checked_filename(filename)?;
        load_json(&self.paths.conditioning_dir().join(filename))
    }
}
