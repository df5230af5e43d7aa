//! 节点注册表：宿主按类名查找节点，并以显示名与分类展示在菜单中

use serde::Serialize;

pub const CATEGORY_CLOUD: &str = "JLNodes/cloud";
pub const CATEGORY_LATENT: &str = "JLNodes/latent";
pub const CATEGORY_CONDITIONING: &str = "JLNodes/conditioning";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub class_name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
}

const fn node(class_name: &'static str, display_name: &'static str, category: &'static str) -> NodeInfo {
    NodeInfo {
        class_name,
        display_name,
        category,
    }
}

/// 按注册顺序排列
const REGISTRY: [NodeInfo; 8] = [
    node("S3ImageNode", "S3 Upload (Image)", CATEGORY_CLOUD),
    node("S3VideoNode", "S3 Upload (Video)", CATEGORY_CLOUD),
    node("AzureImageNode", "Azure Upload (Image)", CATEGORY_CLOUD),
    node("AzureVideoNode", "Azure Upload (Video)", CATEGORY_CLOUD),
    node("SaveAndOutputLatent", "Save Latent (Save + Output)", CATEGORY_LATENT),
    node("LoadLatent", "Load Latent", CATEGORY_LATENT),
    node("ConditioningLoadJSONNode", "Load Conditioning (JSON)", CATEGORY_CONDITIONING),
    node("ConditioningSaveJSONNode", "Save Conditioning (JSON)", CATEGORY_CONDITIONING),
];

pub fn registry() -> &'static [NodeInfo] {
    &REGISTRY
}

pub fn find(class_name: &str) -> Option<&'static NodeInfo> {
    REGISTRY.iter().find(|info| info.class_name == class_name)
}
