use image::{GrayImage, RgbImage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::profile::{DetectionMode, DetectionProfile};
use crate::core::error::CropError;
use crate::core::geometry::{AxisBox, GeometryOps, Point2};
use crate::core::image_io;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size2 {
    pub width: f64,
    pub height: f64,
}

/// 检测结果。`found == false` 时几何字段无意义，不能用于裁切
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub found: bool,
    pub center: Point2,
    pub size: Size2,
    /// 度；strict 模式下旋转该角度后 `size.width` 落在水平方向
    pub angle: f64,
    pub source_width: u32,
    pub source_height: u32,
    /// 同一轮廓的正立外接框，只用于生成标注
    pub bounding_box: Option<AxisBox>,
    pub mode: DetectionMode,
    /// fast 模式找不到轮廓时使用了居中默认框
    #[serde(default)]
    pub fallback: bool,
}

impl Detection {
    pub fn not_found(source_width: u32, source_height: u32, mode: DetectionMode) -> Self {
        Self {
            found: false,
            center: Point2::default(),
            size: Size2::default(),
            angle: 0.0,
            source_width,
            source_height,
            bounding_box: None,
            mode,
            fallback: false,
        }
    }

    /// 由正立框构造检测结果（fast 模式与人工修正共用）
    pub fn upright(
        bbox: AxisBox,
        source_width: u32,
        source_height: u32,
        mode: DetectionMode,
    ) -> Self {
        Self {
            found: true,
            center: bbox.center(),
            size: Size2 {
                width: bbox.width,
                height: bbox.height,
            },
            angle: 0.0,
            source_width,
            source_height,
            bounding_box: Some(bbox),
            mode,
            fallback: false,
        }
    }
}

/// 纸钞检测引擎：把几何算子组合成一次"找到物体"的操作
pub struct DetectionEngine {
    ops: GeometryOps,
    profile: DetectionProfile,
}

impl DetectionEngine {
    pub fn new(ops: GeometryOps, profile: DetectionProfile) -> Self {
        Self { ops, profile }
    }

    pub fn strict() -> Self {
        Self::new(GeometryOps::new(), DetectionProfile::strict())
    }

    pub fn fast() -> Self {
        Self::new(GeometryOps::new(), DetectionProfile::fast())
    }

    /// 解码原始字节后检测；只有解码失败会返回错误
    pub fn detect_bytes(&self, bytes: &[u8]) -> Result<Detection, CropError> {
        let image = image_io::decode_rgb(bytes)?;
        Ok(self.detect(&image))
    }

    /// 找不到目标时返回 `found = false`，不会报错
    pub fn detect(&self, image: &RgbImage) -> Detection {
        let (w, h) = image.dimensions();
        let mode = self.profile.mode;
        debug!("🔍 Detecting ({:?}) on {}x{}", mode, w, h);

        let gray = image_io::to_gray(image);
        let mask = self.foreground_mask(&gray);
        let contours = self.ops.find_contours(&mask);
        debug!("   {} outer contours survive filtering", contours.len());

        let Some(contour) = self.ops.largest_by_area(&contours) else {
            return self.fallback_or_not_found(w, h);
        };
        let Some(bbox) = self.ops.axis_aligned_bounding_box(contour) else {
            return self.fallback_or_not_found(w, h);
        };

        match mode {
            DetectionMode::Fast => Detection::upright(bbox, w, h, mode),
            DetectionMode::Strict => {
                let Some(rect) = self.ops.min_area_rect(contour) else {
                    return self.fallback_or_not_found(w, h);
                };

                // 长边永远作为 width，角度吸收 90° 歧义
                let (width, height, angle) = if rect.width < rect.height {
                    (rect.height, rect.width, rect.angle + 90.0)
                } else {
                    (rect.width, rect.height, rect.angle)
                };

                info!(
                    "✅ Banknote found: center=({:.1}, {:.1}) size={:.1}x{:.1} angle={:.2}°",
                    rect.center.x, rect.center.y, width, height, angle
                );

                Detection {
                    found: true,
                    center: rect.center,
                    size: Size2 { width, height },
                    angle,
                    source_width: w,
                    source_height: h,
                    bounding_box: Some(bbox),
                    mode,
                    fallback: false,
                }
            }
        }
    }

    fn foreground_mask(&self, gray: &GrayImage) -> GrayImage {
        let p = &self.profile;
        let edges = self.ops.edge_map(gray, p.canny_low, p.canny_high);

        let mut mask = if p.dilate_kernel > 1 {
            self.ops.dilate(&edges, p.dilate_kernel, p.dilate_iterations)
        } else {
            edges
        };

        if let Some(min_area) = p.min_component_area {
            let components = self.ops.connected_components(&mask);
            mask = self.ops.filter_by_area(&components, min_area);
        }

        if p.restore_extent && p.dilate_kernel > 1 {
            mask = self.ops.erode(&mask, p.dilate_kernel, p.dilate_iterations);
        }

        mask
    }

    fn fallback_or_not_found(&self, w: u32, h: u32) -> Detection {
        match self.profile.fallback_ratio {
            Some(ratio) if w > 0 && h > 0 => {
                warn!("⚠️ No contour found, falling back to centered {:.0}% box", ratio * 100.0);
                let mut detection =
                    Detection::upright(AxisBox::centered(w, h, ratio), w, h, self.profile.mode);
                detection.fallback = true;
                detection
            }
            _ => {
                warn!("⚠️ No banknote contour found in {}x{} image", w, h);
                Detection::not_found(w, h, self.profile.mode)
            }
        }
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::strict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::rotated_rect_image;
    use image::Rgb;

    #[test]
    fn test_strict_blank_image_not_found() {
        let engine = DetectionEngine::strict();
        let image = RgbImage::from_pixel(400, 300, Rgb([0, 0, 0]));
        let detection = engine.detect(&image);
        assert!(!detection.found);
        assert!(detection.bounding_box.is_none());
        assert_eq!((detection.source_width, detection.source_height), (400, 300));
    }

    #[test]
    fn test_strict_small_blob_is_filtered_out() {
        let engine = DetectionEngine::strict();
        let image = rotated_rect_image(600, 600, 40.0, 30.0, 0.0);
        assert!(!engine.detect(&image).found);
    }

    #[test]
    fn test_strict_width_is_long_side() {
        let engine = DetectionEngine::strict();
        for angle in [-30.0, 0.0, 20.0, 80.0] {
            let image = rotated_rect_image(900, 900, 500.0, 250.0, angle);
            let detection = engine.detect(&image);
            assert!(detection.found, "angle {}", angle);
            assert!(detection.size.width >= detection.size.height);
        }
    }

    #[test]
    fn test_strict_recovers_tall_rectangle_orientation() {
        let engine = DetectionEngine::strict();
        // 竖放的纸钞：长边沿 y 方向，应被转成横向
        let image = rotated_rect_image(800, 900, 250.0, 500.0, 0.0);
        let detection = engine.detect(&image);
        assert!(detection.found);
        assert!((detection.size.width - 500.0).abs() <= 3.0);
        assert!((detection.size.height - 250.0).abs() <= 3.0);
        assert!((detection.angle.abs() - 90.0).abs() < 1.0);
    }

    #[test]
    fn test_decode_failure_is_an_error() {
        let engine = DetectionEngine::strict();
        assert!(matches!(
            engine.detect_bytes(b"garbage"),
            Err(CropError::Decode(_))
        ));
    }

    #[test]
    fn test_fast_returns_upright_box() {
        let engine = DetectionEngine::fast();
        let image = rotated_rect_image(200, 160, 80.0, 40.0, 0.0);
        let detection = engine.detect(&image);
        assert!(detection.found);
        assert!(!detection.fallback);
        assert_eq!(detection.angle, 0.0);
        let bbox = detection.bounding_box.unwrap();
        // 小核膨胀会让框略大于物体
        assert!(bbox.width >= 80.0 && bbox.width <= 92.0);
        assert!(bbox.height >= 40.0 && bbox.height <= 52.0);
    }

    #[test]
    fn test_fast_falls_back_to_centered_box() {
        let engine = DetectionEngine::fast();
        let image = RgbImage::from_pixel(100, 50, Rgb([90, 90, 90]));
        let detection = engine.detect(&image);
        assert!(detection.found);
        assert!(detection.fallback);
        assert_eq!(detection.bounding_box, Some(AxisBox::new(10.0, 5.0, 80.0, 40.0)));
    }

    #[test]
    fn test_fast_without_fallback_reports_not_found() {
        let profile = DetectionProfile {
            fallback_ratio: None,
            ..DetectionProfile::fast()
        };
        let engine = DetectionEngine::new(GeometryOps::new(), profile);
        let image = RgbImage::from_pixel(100, 50, Rgb([90, 90, 90]));
        assert!(!engine.detect(&image).found);
    }

    #[test]
    fn test_detection_review_json_shape() {
        let detection = Detection::upright(AxisBox::new(1.0, 2.0, 3.0, 4.0), 10, 10, DetectionMode::Fast);
        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(value["found"], true);
        assert_eq!(value["size"]["width"], 3.0);
        assert_eq!(value["center"]["x"], 2.5);
        assert_eq!(value["angle"], 0.0);
    }
}
