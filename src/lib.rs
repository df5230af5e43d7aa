//! # JL Nodes
//!
//! 生成式媒体流水线（节点图编辑器）的插件节点：
//! - 云存储上传：IMAGE张量或本地视频上传到S3/Azure Blob，可生成签名URL并发送回调（[`cloud`]）
//! - 条件数据的JSON存取，张量以base64嵌入带标签的信封中（[`codec`]、[`conditioning`]）
//! - 潜空间张量检查点的保存与加载（[`latent`]）
//!

pub mod catalog;
pub mod cloud;
pub mod codec;
pub mod conditioning;
pub mod errors;
pub mod latent;
pub mod nodes;
pub mod paths;
pub mod tensor;
