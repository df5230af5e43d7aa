use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{
    Checkpoint, LATENT_EXTENSION, LATENT_KEY, LEGACY_LATENT_KEY, LatentError, VERSION_MARKER_KEY,
};
use crate::catalog::FileCatalog;
use crate::paths::FolderPaths;
use crate::tensor::{DType, Tensor};

/// SD系列VAE的缩放常数
pub const SD_VAE_SCALE: f32 = 0.18215;
/// 加载失败时返回的占位张量形状
pub const DEFAULT_LATENT_SHAPE: [usize; 4] = [1, 4, 8, 8];

/// 检查点的格式版本，只由是否含版本标记键决定。
///
/// 手工在旧格式数据旁加上标记键的文件会被当作已归一化，不再缩放；
/// 文件本身无法区分这两种情况。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatentFormat {
    /// 只有主键，数据未归一化
    Legacy,
    /// 含版本标记键
    Versioned,
}

impl LatentFormat {
    pub fn scale_factor(self) -> f32 {
        match self {
            LatentFormat::Legacy => 1. / SD_VAE_SCALE,
            LatentFormat::Versioned => 1.,
        }
    }
}

/// 加载结果。失败时不报错，而是带上原因退回为全零占位张量
#[derive(Debug, Clone, PartialEq)]
pub enum LatentLoad {
    Loaded { samples: Tensor, format: LatentFormat },
    Fallback { samples: Tensor, reason: String },
}

impl LatentLoad {
    pub fn samples(&self) -> &Tensor {
        match self {
            LatentLoad::Loaded { samples, .. } | LatentLoad::Fallback { samples, .. } => samples,
        }
    }

    pub fn into_samples(self) -> Tensor {
        match self {
            LatentLoad::Loaded { samples, .. } | LatentLoad::Fallback { samples, .. } => samples,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, LatentLoad::Fallback { .. })
    }
}

/// 读取潜空间检查点，返回float32张量（已按格式版本缩放）及格式版本。
/// 两个键同时存在时取`samples`。
pub fn read_latent(path: &Path) -> Result<(Tensor, LatentFormat), LatentError> {
    let checkpoint = Checkpoint::read(path)?;
    let latent = checkpoint
        .get(LEGACY_LATENT_KEY)
        .or_else(|| checkpoint.get(LATENT_KEY))
        .ok_or_else(|| LatentError::MissingKey(format!("{LEGACY_LATENT_KEY}或{LATENT_KEY}")))?;
    let format = if checkpoint.contains(VERSION_MARKER_KEY) {
        LatentFormat::Versioned
    } else {
        LatentFormat::Legacy
    };
    let samples = match format {
        LatentFormat::Versioned => latent.to_f32(),
        LatentFormat::Legacy => latent.scale(format.scale_factor()),
    };
    Ok((samples, format))
}

/// 加载潜空间张量节点
#[derive(Debug, Clone)]
pub struct LoadLatent {
    paths: FolderPaths,
    catalog: FileCatalog,
}

impl LoadLatent {
    pub fn new(paths: FolderPaths) -> Self {
        Self {
            paths,
            catalog: FileCatalog::new(&[LATENT_EXTENSION], true),
        }
    }

    /// 供选择的文件列表（输出目录下递归查找）；为空时给出一个空字符串占位
    pub fn options(&mut self) -> Vec<String> {
        let entries = self.catalog.entries(self.paths.output_dir());
        if entries.is_empty() {
            vec![String::new()]
        } else {
            entries.to_vec()
        }
    }

    /// 让下一次`options()`重新扫描
    pub fn refresh(&mut self) {
        self.catalog.invalidate();
    }

    /// 校验所选文件：非空且存在
    pub fn validate(&self, latent_file: &str) -> Result<PathBuf, LatentError> {
        if latent_file.trim().is_empty() {
            return Err(LatentError::NoFileSelected);
        }
        let path = self
            .paths
            .resolve(latent_file)
            .ok_or_else(|| LatentError::InvalidPath(latent_file.to_string()))?;
        if !path.is_file() {
            return Err(LatentError::FileNotFound(path));
        }
        Ok(path)
    }

    /// 严格加载，任何问题都以错误返回
    pub fn try_load(&self, latent_file: &str) -> Result<(Tensor, LatentFormat), LatentError> {
        let path = self.validate(latent_file)?;
        read_latent(&path)
    }

    /// 加载所选文件。失败时记录警告并退回为`(1,4,8,8)`的全零张量，保证流水线继续运行
    pub fn load(&self, latent_file: &str) -> LatentLoad {
        match self.try_load(latent_file) {
            Ok((samples, format)) => {
                tracing::info!(file = latent_file, ?format, shape = ?samples.shape(), "已加载潜空间张量");
                LatentLoad::Loaded { samples, format }
            }
            Err(e) => {
                tracing::warn!(file = latent_file, error = %e, "加载潜空间张量失败，使用全零占位张量");
                LatentLoad::Fallback {
                    samples: Tensor::zeros(DType::Float32, &DEFAULT_LATENT_SHAPE),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 文件内容的指纹（SHA-256十六进制），宿主据此判断输入是否变化。
    /// 无法计算时返回固定的哨兵字符串。
    pub fn fingerprint(&self, latent_file: &str) -> String {
        if latent_file.trim().is_empty() {
            return "NO_FILE_SELECTED".to_string();
        }
        let Some(path) = self.paths.resolve(latent_file).filter(|p| p.is_file()) else {
            return "FILE_MISSING".to_string();
        };
        match sha256_file(&path) {
            Ok(digest) => digest,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "计算文件指纹失败");
                "HASH_ERROR".to_string()
            }
        }
    }
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
