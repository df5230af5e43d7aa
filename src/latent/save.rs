use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value as Json};

use super::{Checkpoint, LATENT_EXTENSION, LATENT_KEY, LatentError, VERSION_MARKER_KEY};
use crate::paths::{FolderPaths, safe_join};
use crate::tensor::{DType, Tensor};

/// 供界面展示的保存结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedLatent {
    pub filename: String,
    pub subfolder: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// 保存节点的输出：原样传出的潜空间张量，以及保存位置
#[derive(Debug, Clone, PartialEq)]
pub struct SavedLatentOutput {
    pub latent: Tensor,
    pub saved: SavedLatent,
    pub path: PathBuf,
}

/// 保存潜空间张量（保存+输出）节点
#[derive(Debug, Clone)]
pub struct SaveLatent {
    paths: FolderPaths,
    metadata_disabled: bool,
}

impl SaveLatent {
    pub const DEFAULT_PREFIX: &'static str = "latents/ComfyUI";

    pub fn new(paths: FolderPaths) -> Self {
        Self {
            paths,
            metadata_disabled: false,
        }
    }

    /// 不在检查点中写入提示词等元数据
    pub fn with_metadata_disabled(mut self, disabled: bool) -> Self {
        self.metadata_disabled = disabled;
        self
    }

    /// `filename_prefix`可以带子目录，如`latents/ComfyUI`。
    /// `prompt`与`extra_info`中的每一项都以JSON文本写入检查点元数据。
    pub fn save(
        &self,
        samples: &Tensor,
        filename_prefix: &str,
        prompt: Option<&Json>,
        extra_info: Option<&Map<String, Json>>,
    ) -> Result<SavedLatentOutput, LatentError> {
        let (folder, subfolder, name) = self.resolve_prefix(filename_prefix)?;
        let counter = next_counter(&folder, &name);
        let filename = format!("{name}_{counter:05}_.{LATENT_EXTENSION}");
        let path = folder.join(&filename);

        let mut checkpoint = Checkpoint::new();
        checkpoint.insert(LATENT_KEY, samples.clone());
        checkpoint.insert(VERSION_MARKER_KEY, Tensor::zeros(DType::Float32, &[0]));
        if !self.metadata_disabled {
            let prompt_info = match prompt {
                Some(prompt) => serde_json::to_string(prompt)?,
                None => String::new(),
            };
            checkpoint.set_metadata("prompt", prompt_info);
            for (key, value) in extra_info.into_iter().flatten() {
                checkpoint.set_metadata(key.clone(), serde_json::to_string(value)?);
            }
        }
        checkpoint.write(&path)?;

        tracing::info!(path = %path.display(), shape = ?samples.shape(), "已保存潜空间张量");
        Ok(SavedLatentOutput {
            latent: samples.clone(),
            saved: SavedLatent {
                filename,
                subfolder,
                kind: "output".to_string(),
            },
            path,
        })
    }

    /// 拆分前缀为(目标目录, 子目录, 文件名前缀)
    fn resolve_prefix(&self, filename_prefix: &str) -> Result<(PathBuf, String, String), LatentError> {
        let prefix = filename_prefix.trim().replace('\\', "/");
        let (subfolder, name) = match prefix.rsplit_once('/') {
            Some((subfolder, name)) => (subfolder.to_string(), name.to_string()),
            None => (String::new(), prefix.clone()),
        };
        if name.is_empty() {
            return Err(LatentError::InvalidPath(filename_prefix.to_string()));
        }
        let folder = safe_join(self.paths.output_dir(), &subfolder)
            .ok_or_else(|| LatentError::InvalidPath(filename_prefix.to_string()))?;
        Ok((folder, subfolder, name))
    }
}

/// 计算下一个计数器：`folder`中已有的`<name>_<数字>_...`文件的最大编号加1，没有则为1
pub fn next_counter(folder: &Path, name: &str) -> u64 {
    let stem = format!("{name}_");
    let Ok(entries) = std::fs::read_dir(folder) else {
        return 1;
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let filename = entry.file_name().to_string_lossy().into_owned();
            let rest = filename.strip_prefix(&stem)?;
            let (digits, _) = rest.split_once('_')?;
            digits.parse::<u64>().ok()
        })
        .max()
        .map_or(1, |max| max + 1)
}
