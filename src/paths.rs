//! 宿主输出目录的配置
//!
//! 所有节点读写的文件都位于同一个输出目录下：显式指定，或取环境变量`JLNODES_OUTPUT_DIR`，默认`./output`。

use std::path::{Component, Path, PathBuf};

/// 覆盖默认输出目录的环境变量
pub const OUTPUT_DIR_ENV: &str = "JLNODES_OUTPUT_DIR";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
/// 条件数据JSON文件所在的子目录
pub const CONDITIONING_SUBDIR: &str = "conditioning";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPaths {
    output_dir: PathBuf,
}

impl FolderPaths {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn from_env() -> Self {
        let output_dir = std::env::var_os(OUTPUT_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from);
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn conditioning_dir(&self) -> PathBuf {
        self.output_dir.join(CONDITIONING_SUBDIR)
    }

    /// 将相对路径拼接到输出目录下；绝对路径或含`..`的路径会逃出输出目录，返回None
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        safe_join(&self.output_dir, relative)
    }
}

impl Default for FolderPaths {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 仅接受由普通路径段组成的相对路径（`.`会被忽略）
pub fn safe_join(base: &Path, relative: &str) -> Option<PathBuf> {
    let relative = relative.replace('\\', "/");
    let mut joined = base.to_path_buf();
    for component in Path::new(&relative).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}
