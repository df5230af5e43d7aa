//! # 潜空间张量（latent）检查点
//!
//! - [`SaveLatent`]: 按`<前缀>_<计数器:05>_.latent`命名保存，并原样输出潜空间张量
//! - [`LoadLatent`]: 从输出目录加载，任何失败都退回为形状`(1,4,8,8)`的全零张量
//! - [`Checkpoint`]: 键值张量检查点（safetensors布局）的读写
//!
//! 格式版本：只含主键`latent_tensor`的检查点是旧格式，加载时乘以`1/0.18215`；
//! 同时含版本标记键`latent_format_version_0`的检查点已是归一化数据，缩放因子为1。
//! 缩放规则只看标记键是否存在：若有人手工往旧数据里加上标记键，加载时不会再缩放，这里无从察觉。

mod checkpoint;
mod error;
mod load;
mod save;

pub use self::checkpoint::{Checkpoint, METADATA_KEY};
pub use self::error::LatentError;
pub use self::load::{
    DEFAULT_LATENT_SHAPE, LatentFormat, LatentLoad, LoadLatent, SD_VAE_SCALE, read_latent,
};
pub use self::save::{SaveLatent, SavedLatent, SavedLatentOutput, next_counter};


/// 潜空间文件扩展名（不含点号）
pub const LATENT_EXTENSION: &str = "latent";
/// 主键
pub const LATENT_KEY: &str = "latent_tensor";
/// 旧版文件使用的主键
pub const LEGACY_LATENT_KEY: &str = "samples";
/// 版本标记键，值为空张量
pub const VERSION_MARKER_KEY: &str = "latent_format_version_0";
