use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// 深度流程：大核膨胀 + 面积过滤 + 旋转矫正
    Strict,
    /// 轻量流程：小核膨胀，只输出正立外接框
    Fast,
}

/// 检测参数组。strict / fast 两组都是正式配置，按工作流选择
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionProfile {
    pub mode: DetectionMode,
    pub canny_low: f32,
    pub canny_high: f32,
    /// 方形结构元边长，0 表示跳过膨胀
    pub dilate_kernel: u32,
    pub dilate_iterations: u32,
    /// 连通域面积下限（像素），None 表示不过滤
    pub min_component_area: Option<u64>,
    /// 面积过滤后用同尺寸结构元腐蚀回去，使轮廓贴合物体而不是膨胀光晕
    pub restore_extent: bool,
    /// 找不到轮廓时用居中的默认框（占宽高的比例）代替
    pub fallback_ratio: Option<f64>,
}

impl Default for DetectionProfile {
    fn default() -> Self {
        Self::strict()
    }
}

impl DetectionProfile {
    pub fn strict() -> Self {
        Self {
            mode: DetectionMode::Strict,
            canny_low: 100.0,
            canny_high: 250.0,
            dilate_kernel: 71,
            dilate_iterations: 1,
            min_component_area: Some(100_000),
            restore_extent: true,
            fallback_ratio: None,
        }
    }

    pub fn fast() -> Self {
        Self {
            mode: DetectionMode::Fast,
            canny_low: 30.0,
            canny_high: 150.0,
            dilate_kernel: 5,
            dilate_iterations: 2,
            min_component_area: None,
            restore_extent: false,
            fallback_ratio: Some(0.8),
        }
    }

    pub fn for_mode(mode: DetectionMode) -> Self {
        match mode {
            DetectionMode::Strict => Self::strict(),
            DetectionMode::Fast => Self::fast(),
        }
    }
}
