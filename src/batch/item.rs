use std::path::Path;

use super::state_machine::{ItemEvent, ItemState};
use crate::core::deskew::CropResult;
use crate::core::detection::Detection;
use crate::core::error::CropError;
use crate::core::geometry::AxisBox;
use crate::core::label::NormalizedLabel;

/// 一张源图及其逐步推进的处理状态
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name: String,
    pub bytes: Vec<u8>,
    pub state: ItemState,
    pub detection: Option<Detection>,
    /// 人工给出的替换框，存在时优先于检测结果
    pub correction: Option<AxisBox>,
    pub crop: Option<CropResult>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            state: ItemState::new(),
            detection: None,
            correction: None,
            crop: None,
        }
    }

    pub fn advance(&mut self, event: ItemEvent) -> Result<(), CropError> {
        self.state = self.state.transition(event)?;
        Ok(())
    }

    /// `<原文件名去扩展名>_cropped.png`
    pub fn entry_name(&self) -> String {
        let stem = Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name);
        format!("{}_cropped.png", stem)
    }

    /// 实际用于裁切的正立框：人工框优先，否则取检测轮廓的外接框
    pub fn label_box(&self) -> Option<AxisBox> {
        if let Some(correction) = self.correction {
            return Some(correction);
        }
        self.detection
            .as_ref()
            .filter(|d| d.found)
            .and_then(|d| d.bounding_box)
    }

    /// 相对原图尺寸归一化；没有可用框时返回 None
    pub fn label(&self, class_id: u32) -> Option<NormalizedLabel> {
        let detection = self.detection.as_ref()?;
        let bbox = self.label_box()?;
        Some(NormalizedLabel::from_box(
            class_id,
            &bbox,
            detection.source_width,
            detection.source_height,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detection::DetectionMode;

    #[test]
    fn test_entry_name_uses_stem() {
        assert_eq!(BatchItem::new("IMG_001.JPG", vec![]).entry_name(), "IMG_001_cropped.png");
        assert_eq!(BatchItem::new("dir/a.b.png", vec![]).entry_name(), "a.b_cropped.png");
        assert_eq!(BatchItem::new("noext", vec![]).entry_name(), "noext_cropped.png");
    }

    #[test]
    fn test_correction_wins_over_detection() {
        let mut item = BatchItem::new("a.jpg", vec![]);
        item.detection = Some(Detection::upright(
            AxisBox::new(0.0, 0.0, 10.0, 10.0),
            100,
            50,
            DetectionMode::Fast,
        ));
        assert_eq!(item.label_box(), Some(AxisBox::new(0.0, 0.0, 10.0, 10.0)));

        item.correction = Some(AxisBox::new(50.0, 0.0, 50.0, 50.0));
        let label = item.label(2).unwrap();
        assert_eq!(label.to_string(), "2 0.750000 0.500000 0.500000 1.000000");
    }

    #[test]
    fn test_not_found_has_no_label() {
        let mut item = BatchItem::new("a.jpg", vec![]);
        item.detection = Some(Detection::not_found(100, 50, DetectionMode::Strict));
        assert!(item.label(0).is_none());
    }
}
