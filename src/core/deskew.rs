//! 旋转矫正 + 带边距裁切

use image::{imageops, RgbImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::detection::Detection;
use crate::core::error::CropError;
use crate::core::geometry::{Affine2, AxisBox, GeometryOps};
use crate::core::image_io;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// 四周固定留白（像素），用来容忍矩形拟合误差
    pub padding: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { padding: 2.0 }
    }
}

/// 无损编码后的裁切结果
#[derive(Debug, Clone)]
pub struct CropResult {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CropResult {
    pub fn is_empty(&self) -> bool {
        self.png.is_empty() || self.width == 0 || self.height == 0
    }
}

pub struct DeskewCropEngine {
    ops: GeometryOps,
    config: CropConfig,
}

impl DeskewCropEngine {
    pub fn new(ops: GeometryOps, config: CropConfig) -> Self {
        Self { ops, config }
    }

    pub fn with_padding(padding: f64) -> Self {
        Self::new(GeometryOps::new(), CropConfig { padding })
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// 每次都从原始字节重新解码，不复用预览阶段的像素
    pub fn crop_bytes(&self, bytes: &[u8], detection: &Detection) -> Result<CropResult, CropError> {
        let image = image_io::decode_rgb(bytes)?;
        self.crop(&image, detection)
    }

    pub fn crop(&self, image: &RgbImage, detection: &Detection) -> Result<CropResult, CropError> {
        let rotated = self.deskew(image, detection)?;
        Self::encode(rotated)
    }

    /// 旋转到 width 水平后按中心窗口切出，返回未编码的像素
    pub fn deskew(&self, image: &RgbImage, detection: &Detection) -> Result<RgbImage, CropError> {
        if !detection.found {
            return Err(CropError::NotFound);
        }

        let (w, h) = (image.width() as f64, image.height() as f64);
        let center = detection.center;
        let angle = detection.angle;

        let rotation = Affine2::rotation(center, angle, 1.0);
        let abs_cos = rotation.m[0][0].abs();
        let abs_sin = rotation.m[0][1].abs();
        let bound_w = (h * abs_sin + w * abs_cos).trunc();
        let bound_h = (h * abs_cos + w * abs_sin).trunc();

        // 原中心映射到新画布中心
        let shift_x = bound_w / 2.0 - center.x;
        let shift_y = bound_h / 2.0 - center.y;

        let half_w = detection.size.width / 2.0 + self.config.padding;
        let half_h = detection.size.height / 2.0 + self.config.padding;
        let x1 = ((bound_w / 2.0 - half_w).trunc()).max(0.0);
        let y1 = ((bound_h / 2.0 - half_h).trunc()).max(0.0);
        let x2 = ((bound_w / 2.0 + half_w).trunc()).min(bound_w);
        let y2 = ((bound_h / 2.0 + half_h).trunc()).min(bound_h);

        if x2 <= x1 || y2 <= y1 {
            warn!(
                "⚠️ Degenerate crop window [{}, {}) x [{}, {}) on {}x{} canvas",
                x1, x2, y1, y2, bound_w, bound_h
            );
            return Err(CropError::DegenerateCrop);
        }

        debug!(
            "✂️ Deskew angle={:.2}° canvas={}x{} window=({}, {})-({}, {})",
            angle, bound_w, bound_h, x1, y1, x2, y2
        );

        // 只在裁切窗口内采样，像素与整幅画布先旋转再切片一致
        let out_w = (x2 - x1) as u32;
        let out_h = (y2 - y1) as u32;
        Ok(self.ops.affine_rotate(
            image,
            center,
            angle,
            out_w,
            out_h,
            (shift_x - x1, shift_y - y1),
        ))
    }

    /// 人工给出的正立框：直接按框切，不再检测也不旋转
    pub fn crop_box(&self, image: &RgbImage, bbox: &AxisBox) -> Result<CropResult, CropError> {
        if !bbox.is_finite() {
            warn!("⚠️ User box {:?} is not finite", bbox);
            return Err(CropError::DegenerateCrop);
        }
        let (x0, y0, x1, y1) = bbox.clamped_span(image.width(), image.height());
        let (x0, y0) = (x0.trunc() as u32, y0.trunc() as u32);
        let (x1, y1) = (x1.trunc() as u32, y1.trunc() as u32);
        if x1 <= x0 || y1 <= y0 {
            warn!("⚠️ User box {:?} has no area inside the image", bbox);
            return Err(CropError::DegenerateCrop);
        }
        let cropped = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
        Self::encode(cropped)
    }

    pub fn crop_box_bytes(&self, bytes: &[u8], bbox: &AxisBox) -> Result<CropResult, CropError> {
        let image = image_io::decode_rgb(bytes)?;
        self.crop_box(&image, bbox)
    }

    fn encode(image: RgbImage) -> Result<CropResult, CropError> {
        let (width, height) = image.dimensions();
        let png = image_io::encode_png(&image)?;
        Ok(CropResult { png, width, height })
    }
}

impl Default for DeskewCropEngine {
    fn default() -> Self {
        Self::new(GeometryOps::new(), CropConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detection::{DetectionEngine, DetectionMode, Size2};
    use crate::core::fixtures::rotated_rect_image;
    use crate::core::geometry::Point2;

    fn detection(cx: f64, cy: f64, w: f64, h: f64, angle: f64, src: (u32, u32)) -> Detection {
        Detection {
            found: true,
            center: Point2::new(cx, cy),
            size: Size2 {
                width: w,
                height: h,
            },
            angle,
            source_width: src.0,
            source_height: src.1,
            bounding_box: None,
            mode: DetectionMode::Strict,
            fallback: false,
        }
    }

    fn textured(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([(x * 13 % 251) as u8, (y * 7 % 253) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_zero_angle_centered_crop_matches_slice() {
        let img = textured(100, 80);
        let engine = DeskewCropEngine::with_padding(0.0);
        let det = detection(50.0, 40.0, 40.0, 20.0, 0.0, (100, 80));

        let result = engine.crop(&img, &det).unwrap();
        assert_eq!((result.width, result.height), (40, 20));

        let decoded = image_io::decode_rgb(&result.png).unwrap();
        let expected = imageops::crop_imm(&img, 30, 30, 40, 20).to_image();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_padding_grows_window() {
        let img = textured(100, 80);
        let engine = DeskewCropEngine::with_padding(2.0);
        let det = detection(50.0, 40.0, 40.0, 20.0, 0.0, (100, 80));
        let out = engine.deskew(&img, &det).unwrap();
        assert_eq!(out.dimensions(), (44, 24));
    }

    #[test]
    fn test_window_is_clamped_to_canvas() {
        let img = textured(60, 40);
        let engine = DeskewCropEngine::with_padding(2.0);
        let det = detection(30.0, 20.0, 100.0, 100.0, 0.0, (60, 40));
        let out = engine.deskew(&img, &det).unwrap();
        assert_eq!(out.dimensions(), (60, 40));
    }

    #[test]
    fn test_zero_size_detection_is_degenerate() {
        let img = textured(60, 40);
        let engine = DeskewCropEngine::with_padding(0.0);
        let det = detection(30.0, 20.0, 0.0, 0.0, 0.0, (60, 40));
        assert!(matches!(engine.deskew(&img, &det), Err(CropError::DegenerateCrop)));
    }

    #[test]
    fn test_not_found_cannot_be_cropped() {
        let img = textured(60, 40);
        let engine = DeskewCropEngine::default();
        let det = Detection::not_found(60, 40, DetectionMode::Strict);
        assert!(matches!(engine.crop(&img, &det), Err(CropError::NotFound)));
    }

    #[test]
    fn test_crop_box_uses_user_coordinates() {
        let img = textured(50, 50);
        let engine = DeskewCropEngine::default();
        let result = engine
            .crop_box(&img, &AxisBox::new(-5.0, 10.0, 20.0, 15.0))
            .unwrap();
        assert_eq!((result.width, result.height), (15, 15));
        let decoded = image_io::decode_rgb(&result.png).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), img.get_pixel(0, 10));
    }

    #[test]
    fn test_crop_box_outside_image_is_degenerate() {
        let img = textured(50, 50);
        let engine = DeskewCropEngine::default();
        let result = engine.crop_box(&img, &AxisBox::new(60.0, 60.0, 10.0, 10.0));
        assert!(matches!(result, Err(CropError::DegenerateCrop)));
    }

    #[test]
    fn test_crop_box_with_nan_is_degenerate() {
        let img = textured(50, 50);
        let engine = DeskewCropEngine::default();
        for bbox in [
            AxisBox::new(f64::NAN, 0.0, 20.0, 20.0),
            AxisBox::new(0.0, 0.0, 20.0, f64::INFINITY),
        ] {
            let result = engine.crop_box(&img, &bbox);
            assert!(matches!(result, Err(CropError::DegenerateCrop)));
        }
    }

    #[test]
    fn test_rotated_banknote_end_to_end() {
        // 1000x2000 黑底，300x600 白色矩形旋转 15°
        let img = rotated_rect_image(1000, 2000, 600.0, 300.0, 15.0);
        let detection = DetectionEngine::strict().detect(&img);
        assert!(detection.found);
        assert!(
            detection.angle >= 10.0 && detection.angle <= 20.0,
            "angle {}",
            detection.angle
        );

        let out = DeskewCropEngine::with_padding(2.0)
            .deskew(&img, &detection)
            .unwrap();
        let (w, h) = out.dimensions();
        assert!((w as i64 - 604).abs() <= 3, "width {}", w);
        assert!((h as i64 - 304).abs() <= 3, "height {}", h);

        // 矫正后中心区域应为纯白
        let center = out.get_pixel(w / 2, h / 2);
        assert_eq!(center.0, [255, 255, 255]);
    }
}
