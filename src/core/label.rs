//! 归一化标注（YOLO 格式）

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::geometry::AxisBox;

/// `(class_id, cx, cy, w, h)`，全部相对原始未旋转图像尺寸，取值 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLabel {
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl NormalizedLabel {
    /// 先把框裁到图像内再归一化，贴边的框也不会出现负值或大于 1
    pub fn from_box(class_id: u32, bbox: &AxisBox, image_width: u32, image_height: u32) -> Self {
        if image_width == 0 || image_height == 0 {
            return Self {
                class_id,
                cx: 0.0,
                cy: 0.0,
                w: 0.0,
                h: 0.0,
            };
        }

        let (x0, y0, x1, y1) = bbox.clamped_span(image_width, image_height);
        let iw = image_width as f64;
        let ih = image_height as f64;
        Self {
            class_id,
            cx: ((x0 + x1) / 2.0 / iw).clamp(0.0, 1.0),
            cy: ((y0 + y1) / 2.0 / ih).clamp(0.0, 1.0),
            w: ((x1 - x0) / iw).clamp(0.0, 1.0),
            h: ((y1 - y0) / ih).clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for NormalizedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.cx, self.cy, self.w, self.h
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_text_format() {
        let label = NormalizedLabel::from_box(0, &AxisBox::new(25.0, 10.0, 50.0, 20.0), 100, 40);
        assert_eq!(label.to_string(), "0 0.500000 0.500000 0.500000 0.500000");
    }

    #[test]
    fn test_box_touching_left_edge_stays_in_range() {
        let label = NormalizedLabel::from_box(0, &AxisBox::new(0.0, 0.0, 30.0, 40.0), 100, 100);
        assert!(label.cx >= 0.0);
        assert!((label.cx - 0.15).abs() < 1e-12);
        assert!((label.cy - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_box_overflowing_image_is_clamped() {
        let label = NormalizedLabel::from_box(3, &AxisBox::new(-20.0, 80.0, 200.0, 50.0), 100, 100);
        for v in [label.cx, label.cy, label.w, label.h] {
            assert!((0.0..=1.0).contains(&v), "{}", v);
        }
        assert_eq!(label.w, 1.0);
        assert!((label.h - 0.2).abs() < 1e-12);
        assert!(label.to_string().starts_with("3 "));
    }

    #[test]
    fn test_zero_sized_image() {
        let label = NormalizedLabel::from_box(0, &AxisBox::new(1.0, 1.0, 1.0, 1.0), 0, 0);
        assert_eq!(label.to_string(), "0 0.000000 0.000000 0.000000 0.000000");
    }

    #[test]
    fn test_nan_box_gives_empty_label() {
        let label = NormalizedLabel::from_box(0, &AxisBox::new(f64::NAN, 1.0, 10.0, 10.0), 100, 100);
        assert_eq!(label.to_string(), "0 0.000000 0.000000 0.000000 0.000000");
    }
}
