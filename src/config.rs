//! 流水线配置，全部字段可选，缺省值即 strict 工作流

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::deskew::CropConfig;
use crate::core::detection::{DetectionMode, DetectionProfile};
use crate::core::error::CropError;
use crate::core::export::ExportConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection: DetectionProfile,
    pub crop: CropConfig,
    pub export: ExportConfig,
    /// 标注中使用的类别编号
    pub class_id: u32,
    /// 每张图片处理完后让出 CPU，方便宿主刷新界面
    pub yield_between_items: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection: DetectionProfile::strict(),
            crop: CropConfig::default(),
            export: ExportConfig::default(),
            class_id: 0,
            yield_between_items: true,
        }
    }
}

impl PipelineConfig {
    pub fn for_mode(mode: DetectionMode) -> Self {
        Self {
            detection: DetectionProfile::for_mode(mode),
            ..Self::default()
        }
    }

    /// 交互预览：fast 检测，由人工修正
    pub fn interactive() -> Self {
        Self::for_mode(DetectionMode::Fast)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CropError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CropError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
